#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Room event payloads are decoded from arbitrary `Message` frame
    // payloads; the decoder must never panic on hostile input.
    let _ = serde_json::from_slice::<roomcast_client::protocol::RoomEvent>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<roomcast_client::protocol::RoomEvent>(s);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use ollama_wire::{ChatStreamUpdate, decode_line};

fuzz_target!(|data: &[u8]| {
    // Must never panic; a decoded terminal update must carry done = true.
    if let Ok(ChatStreamUpdate::Done(done)) = decode_line(data) {
        assert!(done.chunk.done);
    }
});

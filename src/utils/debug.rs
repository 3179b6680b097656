//! Stream-marker macros for the `debug_format` feature. The writer mixes a
//! literal into the bit stream and the reader asserts it back out, so a
//! desynchronized decoder fails at the marker instead of somewhere
//! downstream. Both sides must be built with the feature or neither.

#[macro_export]
macro_rules! debug_write {
    ($msg:literal, $writer:expr) => {
        #[cfg(feature = "debug_format")]
        {
            for byte in $msg.as_bytes() {
                $writer.write(*byte as u32, 8);
            }
        }
    };
}

#[macro_export]
macro_rules! debug_expect {
    ($msg:literal, $reader:expr) => {
        #[cfg(feature = "debug_format")]
        {
            for byte in $msg.as_bytes() {
                assert!(
                    *byte as u32 == $reader.read(8).unwrap(),
                    "stream marker {:?} did not match",
                    $msg
                );
            }
        }
    };
}

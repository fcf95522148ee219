use crate::buffer::{WireSink, WireSource};
use crate::error::{Result, WireError};

/// A value that can be written to a [`WireSink`].
pub trait Encode {
    fn encode(&self, sink: &mut dyn WireSink);
}

/// A value that can be read back from a [`WireSource`].
pub trait Decode: Sized {
    fn decode(source: &mut dyn WireSource) -> Result<Self>;
}

// Fixed-width primitives travel as their little-endian byte representation.
macro_rules! impl_wire_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, sink: &mut dyn WireSink) {
                    sink.put(&self.to_le_bytes());
                }
            }

            impl Decode for $ty {
                fn decode(source: &mut dyn WireSource) -> Result<Self> {
                    let raw = source.take(std::mem::size_of::<$ty>())?;
                    Ok(<$ty>::from_le_bytes(
                        raw.try_into().expect("take returns the requested length"),
                    ))
                }
            }
        )*
    };
}

impl_wire_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Encode for bool {
    fn encode(&self, sink: &mut dyn WireSink) {
        u8::from(*self).encode(sink);
    }
}

impl Decode for bool {
    fn decode(source: &mut dyn WireSource) -> Result<Self> {
        Ok(u8::decode(source)? != 0)
    }
}

/// Strings are encoded as `u64(len + 1)`, the UTF-8 bytes, then one zero
/// terminator byte. The length prefix counts the terminator, so decoding
/// takes exactly `len` bytes and the source position lands on the next
/// field either way.
impl Encode for str {
    fn encode(&self, sink: &mut dyn WireSink) {
        let len_with_terminator = self.len() as u64 + 1;
        len_with_terminator.encode(sink);
        sink.put(self.as_bytes());
        0u8.encode(sink);
    }
}

impl Encode for String {
    fn encode(&self, sink: &mut dyn WireSink) {
        self.as_str().encode(sink);
    }
}

impl Decode for String {
    fn decode(source: &mut dyn WireSource) -> Result<Self> {
        let len_with_terminator = u64::decode(source)?;
        if len_with_terminator == 0 {
            return Err(WireError::InvalidLength { len: 0 });
        }

        let raw = source.take(len_with_terminator as usize)?;
        // Strip the terminator byte; it was only taken to keep the stream
        // position correct.
        let payload = raw[..raw.len() - 1].to_vec();
        Ok(String::from_utf8(payload)?)
    }
}

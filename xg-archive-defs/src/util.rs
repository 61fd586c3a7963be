use std::{
    fmt,
    io::{Seek, SeekFrom},
    marker::PhantomData,
};

use serde::{
    de::{DeserializeOwned, SeqAccess, Visitor},
    ser::SerializeTuple,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// Helper macro to ensure the structs we're deserializing are the correct
/// size.
macro_rules! assert_size {
    ($t:ty, $n:literal) => {
        const _: fn() = || {
            let _ = core::mem::transmute::<$t, [u8; $n]>;
        };
    };
    ($t:ty, $e:expr) => {
        const _: fn() = || {
            let _ = core::mem::transmute::<$t, [u8; $e]>;
        };
    };
}
pub(crate) use assert_size;

/// C-like `sizeof`. Accepts types and values.
macro_rules! size_of {
    ($t:ty) => {
        core::mem::size_of::<$t>()
    };
    ($e:expr) => {
        core::mem::size_of_val($e)
    };
}
pub(crate) use size_of;

// ============================================================================
// serde only implements Serialize/Deserialize for arrays up to length 32.
// XG's GDF header (1024-u16 free text fields) and file registry (256-byte
// Pascal string buffers) both exceed that, so we need our own impl, same as
// any other consumer stuck on arrays serde doesn't cover natively.

pub(crate) trait BigArray<'de>: Sized {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>;
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>;
}

pub(crate) struct ArrayVisitor<T, const N: usize> {
    element: PhantomData<[T; N]>,
}

impl<T, const N: usize> ArrayVisitor<T, N> {
    pub fn new() -> Self {
        Self {
            element: PhantomData,
        }
    }
}

impl<'de, T: Default + Copy + Deserialize<'de>, const N: usize> Visitor<'de>
    for ArrayVisitor<T, N>
{
    type Value = [T; N];

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(&format!("an array of length {}", N))
    }

    #[allow(clippy::needless_range_loop)]
    fn visit_seq<A>(self, mut seq: A) -> Result<[T; N], A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut arr = [T::default(); N];
        for i in 0..N {
            arr[i] = seq
                .next_element()?
                .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
        }
        Ok(arr)
    }
}

macro_rules! big_array {
    ($($len:expr,)+) => {
        $(
            impl<'de, T: Default + Copy + Deserialize<'de> + Serialize> BigArray<'de> for [T; $len] {
                fn deserialize<D>(
                    deserializer: D
                ) -> Result<[T; $len], D::Error>
                    where D: Deserializer<'de>
                {
                    let visitor = ArrayVisitor::<T, $len>::new();
                    deserializer.deserialize_tuple($len, visitor)
                }

                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    let mut st = serializer.serialize_tuple($len)?;
                    for t in self {
                        st.serialize_element(&t)?;
                    };
                    st.end()
                }
            }
        )+
    }
}
pub(crate) use big_array;
// ============================================================================

// ============================================================================
/// [`Seek::stream_len`] isn't stable yet, so we implement it manually here.
pub(crate) trait StreamLen: Seek {
    fn stream_len_(&mut self) -> std::io::Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}

impl<T: Seek> StreamLen for T {}
// ============================================================================

pub mod io;

pub use io::{Compression, FastReader, FastWriter};

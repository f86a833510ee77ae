mod goal;

pub use goal::*;

pub use arcstr;
pub use gds21;
pub use tftgeom;

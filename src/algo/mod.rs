pub mod ewma;

pub use ewma::Ewma;

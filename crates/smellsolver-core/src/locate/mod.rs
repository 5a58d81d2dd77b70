pub mod context;
pub mod mapper;
pub mod normalize;

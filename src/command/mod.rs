pub mod extractor;
pub mod model;
pub mod validator;

pub mod controller;
pub mod filename;
pub mod validation;
pub mod view;

pub mod home;
pub mod learning_graph;
pub mod not_found;

pub mod common;
pub mod incremental;
pub mod path_tree;
pub mod reference;

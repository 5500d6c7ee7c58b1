mod materialize_view;

pub use materialize_view::{MaterializeViewUseCase, CSV_CONTENT_TYPE};

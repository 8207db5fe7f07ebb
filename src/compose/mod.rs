pub(crate) mod interaction;
pub(crate) mod layout;
pub(crate) mod scene;

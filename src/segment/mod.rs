pub(crate) mod remover;

pub mod doc_store;
pub mod token_service;

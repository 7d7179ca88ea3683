pub mod linear;
pub mod trie;
pub mod vocabulary;

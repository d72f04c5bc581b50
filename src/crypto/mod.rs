//! # Secret Encryption
//!
//! Field-level symmetric encryption for operator-entered secrets
//! (mail account and device passwords) using AES-256-GCM.

pub mod cipher;

pub use cipher::SecretCipher;

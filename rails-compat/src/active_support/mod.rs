/*!
 Cryptographic helpers compatible with Rails' `ActiveSupport`.
*/

pub mod key_generator;
pub mod message_verifier;

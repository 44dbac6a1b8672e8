/*!
 Errors that can happen while reading Rails-produced data.
*/

pub mod key_generator;
pub mod marshal;
pub mod message_verifier;
pub mod session;

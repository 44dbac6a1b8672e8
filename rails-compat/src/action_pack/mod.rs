/*!
 Readers for data that Rails' `ActionPack` stores on the client.
*/

pub mod session;

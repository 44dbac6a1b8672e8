/*!
 This module defines decoders for the serialization formats Rails uses.
*/

pub mod marshal;

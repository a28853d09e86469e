//! Transaction codec
//!
//! - `tx`: transaction, message and sign-doc structures
//! - `codec`: length-prefixed framing, decoding and hashing

pub mod codec;
pub mod tx;

pub use codec::{decode_tx, encode_tx, hash_tx, CodecError, TxCodec, MAX_TX_SIZE};
pub use tx::{Msg, MsgSend, StdFee, StdSignDoc, StdSignature, StdTx, MSG_SEND};

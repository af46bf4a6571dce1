//! External serializer bridge for the quill wire format.
//!
//! [`ExternalCodec`] lets a [`CodecProvider`](quill_serialize::CodecProvider)
//! hand values of selected types to an external binary serializer while
//! still taking part in the quill protocol: tag-delimited framing, reference
//! tracking and polymorphic type resolution.
//!
//! # Wire frame
//!
//! Each value is written as one tag-delimited field whose header names the
//! codec's identity type ([`ExternalField`]), followed by two sub-fields:
//!
//! ```text
//! Header(TagDelimited, ExternalField)
//!   Field 0: LengthPrefixed, runtime type identifier
//!   Field 1: LengthPrefixed, external serializer payload
//! EndObject
//! ```
//!
//! The runtime type is always written, never the declared type, because the
//! reader needs the exact type to hand the payload back to the serializer.
//!
//! # Eligibility
//!
//! Whether a type is handled is decided per [`Purpose`] by
//! [`ExternalCodec::is_eligible`]:
//!
//! 1. The identity type is always eligible.
//! 2. Types that cannot hold data ([`TypeKind::Abstract`],
//!    [`TypeKind::Framework`]) never are.
//! 3. A caller-supplied override from [`ExternalCodecOptions`] decides when it
//!    returns [`Eligibility::Allow`] or [`Eligibility::Deny`].
//! 4. Otherwise [`ExternalSerializer::is_contract`] decides; the answer is
//!    cached for the lifetime of the process.
//!
//! # Contracts
//!
//! The bundled [`Bincode`] serializer handles types declared with
//! [`external_contract!`]:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Identifiable)]
//! struct Point { x: i32, y: i32 }
//!
//! external_contract!(Point);
//!
//! let mut builder = CodecProvider::builder();
//! Bincode::install(&mut builder, ExternalCodecOptions::default())?;
//!
//! let serializer = Serializer::new(builder.build());
//! ```
//!
//! [`TypeKind::Abstract`]: quill_serialize::TypeKind::Abstract
//! [`TypeKind::Framework`]: quill_serialize::TypeKind::Framework

pub mod codec;
pub mod contract;
pub mod eligibility;
pub mod options;
pub mod serde_bincode;
pub mod serializer;

pub use codec::{ExternalCodec, ExternalField, WELL_KNOWN_ALIAS};
pub use contract::{CONTRACTS, Contract, ExternalContract};
pub use eligibility::cached_contract_decision;
pub use options::{
    Eligibility, EligibilityOverride, ExternalCodecOptions, Purpose,
};
pub use serde_bincode::{
    Bincode, BincodeOptions, Endian, ExternalError, IntEncoding,
};
pub use serializer::ExternalSerializer;

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}

/// Declares types as external serializer contracts.
///
/// Implements [`ExternalContract`] for each type and adds it to the
/// [`CONTRACTS`] table, which makes it eligible for the [`Bincode`]
/// serializer. Each type must implement `Serialize`, `DeserializeOwned` and
/// `Identifiable`.
///
/// ```ignore
/// external_contract!(Point, Label);
/// ```
#[macro_export]
macro_rules! external_contract {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ExternalContract for $ty {}

            const _: () = {
                #[$crate::__private::linkme::distributed_slice($crate::CONTRACTS)]
                #[linkme(crate = $crate::__private::linkme)]
                static CONTRACT: $crate::Contract = $crate::Contract::of::<$ty>();
            };
        )+
    };
}

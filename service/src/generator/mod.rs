//! Schema text generation
//!
//! - **FlatBuffers** (`flatbuffers.rs`) - `.fbs` tables, enums and `root_type`
//! - **Protocol Buffers** (`protobuf.rs`) - proto2 messages and enums
//!
//! Both emit the shared enum file, the shared fixed-point wrapper records and
//! one file per sheet. Record member order always comes from the canonical
//! layout of each type name, so field slots agree with the encoder.

pub mod flatbuffers;
pub mod protobuf;
pub mod traits;

pub use self::flatbuffers::FlatBuffersGenerator;
pub use self::protobuf::ProtobufGenerator;
pub use self::traits::{GeneratedFile, GeneratorOptions, IndentStyle, SchemaGenerator};

use sheetcfg_core::BinaryFormat;

/// Generator for the requested format
#[must_use]
pub fn generator_for(format: BinaryFormat, options: GeneratorOptions) -> Box<dyn SchemaGenerator> {
    match format {
        BinaryFormat::Flatbuffers => Box::new(FlatBuffersGenerator::with_options(options)),
        BinaryFormat::Protobuf => Box::new(ProtobufGenerator::with_options(options)),
    }
}

//! Error types for sweep evaluation.

#![allow(missing_docs)]

/// Creates the Error, ErrorKind, ResultExt, and Result types
error_chain! {
    errors {
        Parse(file: String) {
            description("malformed sweep filename")
            display("malformed sweep filename: '{}'", file)
        }
        OutOfDomain(file: String, bucket: i64, count: usize) {
            description("parameter outside the sweep's bucket range")
            display("'{}' maps to bucket {}, outside 0..{}", file, bucket, count)
        }
        MissingBaseline(group: String) {
            description("no baseline resolved for sweep group")
            display("no baseline resolved for sweep group '{}'", group)
        }
        FinalizedBucket(bucket: usize) {
            description("insert into a finalized bucket")
            display("bucket {} is finalized; reset the engine before inserting", bucket)
        }
        DimensionMismatch(a: (u32, u32), b: (u32, u32)) {
            description("image dimensions differ")
            display("image dimensions differ: {}x{} vs {}x{}", a.0, a.1, b.0, b.1)
        }
        Corrupt(file: String) {
            description("corrupt measurement file")
            display("corrupt measurement file: '{}'", file)
        }
    }

    foreign_links {
        Io(::std::io::Error);
        Csv(::csv::Error);
        Image(::image::ImageError);
    }
}

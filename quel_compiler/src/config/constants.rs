pub mod compile_time {
    pub mod lexical {
        /// Maximum source size accepted by the lexer (4MB)
        /// SECURITY: Prevents DoS via enormous docblocks or query text
        pub const MAX_SOURCE_SIZE: usize = 4 * 1024 * 1024;

        /// Maximum string literal size (1MB)
        /// SECURITY: Prevents DoS attacks via enormous string literals
        pub const MAX_STRING_SIZE: usize = 1_048_576;

        /// Maximum identifier length (255 characters)
        pub const MAX_IDENTIFIER_LENGTH: usize = 255;

        /// Maximum number of tokens a single `tokenize` call will produce
        pub const MAX_TOKEN_COUNT: usize = 1_000_000;
    }

    pub mod syntax {
        /// Hard ceiling on parser nesting depth
        /// SECURITY: Prevents stack exhaustion via deeply nested structures
        pub const MAX_NESTING_DEPTH: usize = 256;

        /// Nesting depth used when no preference overrides it
        pub const DEFAULT_NESTING_DEPTH: usize = 64;

        /// Maximum height of one expression tree
        /// SECURITY: Operator chains like `a and b and ...` are parsed in a
        /// loop, so they deepen the tree without nesting the parser
        pub const MAX_EXPRESSION_HEIGHT: usize = 512;

        /// Maximum number of `.`-separated segments in one identifier chain
        pub const MAX_IDENTIFIER_CHAIN: usize = 32;

        /// Maximum entries in a parser's class-name resolution cache
        /// RESOURCE: Bounds memory held by a long-lived parser instance
        pub const MAX_RESOLUTION_CACHE_ENTRIES: usize = 4096;
    }

    pub mod batch {
        /// Upper bound on worker threads for parallel parsing
        pub const MAX_THREADS: usize = 64;

        /// Sources handed to the thread pool per chunk
        pub const MAX_CHUNK_SIZE: usize = 50;

        /// Maximum number of sources accepted by one batch
        pub const MAX_SOURCES_PER_BATCH: usize = 100_000;
    }

    pub mod logging {
        /// Maximum number of events kept by the in-memory logger
        pub const MEMORY_LOGGER_CAPACITY: usize = 10_000;

        /// Maximum length of a single context value before truncation
        pub const MAX_CONTEXT_VALUE_LENGTH: usize = 512;
    }
}

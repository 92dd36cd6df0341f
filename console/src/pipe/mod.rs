// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod resilient_pipe;

// Re-export.
pub use resilient_pipe::*;

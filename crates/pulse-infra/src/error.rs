// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for host platform detection.

use thiserror::Error;

/// Errors raised while assembling the host platform.
#[derive(Debug, Error)]
pub enum InfraError {
    /// Called outside of a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    /// The current process could not be inspected.
    #[error("process statistics unavailable: {0}")]
    ProcessUnavailable(String),
}

/// Convenience alias.
pub type InfraResult<T> = Result<T, InfraError>;

// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! Concrete transport (SPEC_FULL.md §B.1): the common envelope encoded as a
//! length-prefixed sequence of UTF-8 frames over TCP, a request/reply
//! listener shared by the peer and API sockets, a publish fan-out listener,
//! and a pooled outbound client for dispatching to peers.

pub mod envelope;
pub mod tcp;

pub use envelope::Envelope;

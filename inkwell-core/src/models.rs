// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub mod category;
pub mod comment;
pub mod follow;
pub mod home_page;
pub mod permission;
pub mod post;
pub mod session;
pub mod user;

pub use category::*;
pub use comment::*;
pub use follow::*;
pub use home_page::*;
pub use permission::*;
pub use post::*;
pub use session::*;
pub use user::*;

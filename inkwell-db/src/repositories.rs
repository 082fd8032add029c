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

pub mod category_repository;
pub mod comment_repository;
pub mod follow_repository;
pub mod home_page_repository;
pub mod post_repository;
pub mod role_repository;
pub mod session_repository;
pub mod tag_repository;
pub mod user_repository;

pub use category_repository::*;
pub use comment_repository::*;
pub use follow_repository::*;
pub use home_page_repository::*;
pub use post_repository::*;
pub use role_repository::*;
pub use session_repository::*;
pub use tag_repository::*;
pub use user_repository::*;

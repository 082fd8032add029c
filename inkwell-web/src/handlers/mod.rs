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

pub mod auth;
pub mod categories;
pub mod follows;
pub mod moderation;
pub mod posts;
pub mod users;
pub mod wechat;

use inkwell_core::pagination::{Page, Pagination};
use serde::Deserialize;

use crate::{error::AppError, AppState};

pub use auth::{
    change_password, change_password_form, confirm, login, login_form, logout, register,
    register_form, resend_confirmation, reset_password, reset_password_form,
    reset_password_request, reset_password_request_form, unconfirmed,
};
pub use categories::{create_category, delete_category, list_categories};
pub use follows::{follow, followers, following, unfollow};
pub use moderation::{delete_comment, disable_comment, enable_comment, moderate};
pub use posts::{
    add_comment, category_posts, delete_post, edit_post, edit_post_form, index, post_detail,
    show_all, show_followed, tag_posts, write_post, write_post_form,
};
pub use users::{edit_profile, edit_profile_admin, edit_profile_admin_form, edit_profile_form, profile};
pub use wechat::{control_pc, control_pc_form, wechat_index, wechat_page};

/// `?page=N` on paginated listings. `-1` asks for the last page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn resolve(&self, per_page: u32, total: u64) -> u32 {
        Pagination::resolve_page(self.page.unwrap_or(1), per_page, total)
    }
}

/// With strict pagination, pages past the end are a 404.
pub fn ensure_in_range<T>(page: &Page<T>, state: &AppState) -> Result<(), AppError> {
    if state.config.pagination.strict && page.pagination.is_out_of_range() {
        return Err(AppError::not_found("Page not found"));
    }
    Ok(())
}

/// HTML checkboxes are either absent or carry some value.
pub(crate) fn checked(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| value != "false" && value != "0")
}

/// Trimmed text, `None` when blank.
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

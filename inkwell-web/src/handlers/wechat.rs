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

//! Static wechat pages and the Wake-on-LAN control page.

use anyhow::{Context as _, Result};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use inkwell_core::wake_on_lan::{magic_packet, target_ports, MacAddress};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::net::UdpSocket;

use crate::{
    auth::{AdminPolicy, Authorized},
    config::WakeOnLanConfig,
    error::AppError,
    flash,
    template_context::PageContext,
    AppState,
};

static PAGE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Failed to compile page name regex"));

#[derive(Debug, Default, Deserialize)]
pub struct WakeForm {
    /// Optional SecureOn password, as hex.
    #[serde(default)]
    pub password: String,
}

pub async fn wechat_index(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    Ok(ctx.render(&state, "wechat/wechat.html")?.into_response())
}

pub async fn wechat_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    if !PAGE_NAME_REGEX.is_match(&page) {
        return Err(AppError::not_found("Page not found"));
    }

    let template = format!("wechat/{}.html", page);
    if !state.templates.has_template(&template) {
        return Err(AppError::not_found("Page not found"));
    }
    Ok(ctx.render(&state, &template)?.into_response())
}

fn parse_mac(raw: &str) -> Result<MacAddress, AppError> {
    raw.parse::<MacAddress>()
        .map_err(|e| AppError::not_found(e.to_string()))
}

pub async fn control_pc_form(
    State(state): State<AppState>,
    Path(mac): Path<String>,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let mac = parse_mac(&mac)?;
    ctx.insert("mac", &mac.to_string());
    ctx.insert("ports", &target_ports(state.config.wake_on_lan.port));
    ctx.insert("broadcast_ip", &state.config.wake_on_lan.broadcast_ip);
    Ok(ctx.render(&state, "wechat/control-pc.html")?.into_response())
}

pub async fn control_pc(
    State(state): State<AppState>,
    admin: Authorized<AdminPolicy>,
    Path(raw): Path<String>,
    jar: CookieJar,
    Form(form): Form<WakeForm>,
) -> Result<Response, AppError> {
    let mac = parse_mac(&raw)?;
    let password = Some(form.password.trim()).filter(|p| !p.is_empty());

    let jar = match wake(&state.config.wake_on_lan, &mac, password).await {
        Ok(()) => {
            tracing::info!(%mac, admin = %admin.user.username, "Wake-on-LAN packet sent");
            flash::success(jar, format!("Magic packet sent to {}.", mac))
        }
        Err(e) => {
            tracing::warn!(%mac, "Wake-on-LAN failed: {:#}", e);
            flash::warning(jar, format!("Could not wake {}: {}", mac, e))
        }
    };
    Ok((jar, Redirect::to(&format!("/wechat/control-pc/{}", raw))).into_response())
}

/// Broadcast the magic packet on every target port.
pub async fn wake(config: &WakeOnLanConfig, mac: &MacAddress, password: Option<&str>) -> Result<()> {
    let packet = magic_packet(mac, password)?;
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("Failed to bind UDP socket")?;
    socket
        .set_broadcast(true)
        .context("Failed to enable broadcast")?;

    for port in target_ports(config.port) {
        socket
            .send_to(&packet, (config.broadcast_ip.as_str(), port))
            .await
            .with_context(|| format!("Failed to send to {}:{}", config.broadcast_ip, port))?;
    }
    Ok(())
}

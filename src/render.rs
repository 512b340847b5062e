//! Front ends that draw command output.
//!
//! The same structures can be emitted as JSON for another program to draw, or as plain text bar
//! charts for a terminal.

use crate::charts::{
    AuditRatio, AuditsView, Chart, ChartKind, Dashboard, GradesView, Profile, SkillsView, XpView,
};
use crate::commands::Status;
use crate::metrics::PassRatio;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

const BAR_WIDTH: usize = 40;
const KEY_WIDTH: usize = 24;

/// The output front end.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Text charts for a terminal.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

serde_plain::derive_display_from_serialize!(Format);
serde_plain::derive_fromstr_from_deserialize!(Format);

/// Something that can be drawn as text.
pub trait Render {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result;

    fn to_text(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.render_text(&mut out)?;
        Ok(out)
    }
}

impl Render for () {
    fn render_text(&self, _out: &mut dyn Write) -> fmt::Result {
        Ok(())
    }
}

/// Whole numbers without decimals, everything else with two, both with thousands separators.
pub(crate) fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 {
        format_num::format_num!(",.0f", value)
    } else {
        format_num::format_num!(",.2f", value)
    }
}

fn truncate_key(key: &str) -> String {
    if key.chars().count() <= KEY_WIDTH {
        return key.to_string();
    }
    let mut short: String = key.chars().take(KEY_WIDTH - 1).collect();
    short.push('…');
    short
}

impl Render for Chart {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "{} [{}]", self.title, self.kind)?;
        if self.buckets.is_empty() {
            writeln!(out, "  (no data)")?;
            return Ok(());
        }
        let max = self
            .buckets
            .iter()
            .map(|b| b.value().abs())
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let total: f64 = self.buckets.iter().map(|b| b.value()).sum();
        for bucket in &self.buckets {
            let len = if max > 0.0 && bucket.value().is_finite() {
                ((bucket.value().abs() / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let share = match self.kind {
                ChartKind::Pie if total > 0.0 => {
                    format!(" ({:.1}%)", bucket.value() / total * 100.0)
                }
                _ => String::new(),
            };
            writeln!(
                out,
                "  {:<width$} │{:<bar$} {}{share}",
                truncate_key(bucket.key()),
                "█".repeat(len),
                format_value(bucket.value()),
                width = KEY_WIDTH,
                bar = BAR_WIDTH,
            )?;
        }
        Ok(())
    }
}

impl Render for PassRatio {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(
            out,
            "Passed {} / failed {} (ratio {:.2})",
            self.pass, self.fail, self.ratio
        )?;
        Ok(())
    }
}

impl Render for AuditRatio {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(
            out,
            "Audit ratio {:.1} (done {}, received {})",
            self.ratio,
            format_value(self.done),
            format_value(self.received)
        )?;
        Ok(())
    }
}

impl Render for Profile {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        let user = &self.user;
        writeln!(out, "{} (id {})", user.login, user.id)?;
        if let Some(email) = &user.email {
            writeln!(out, "Email: {email}")?;
        }
        if let Some(campus) = &user.campus {
            writeln!(out, "Campus: {campus}")?;
        }
        writeln!(out, "Total XP: {}", format_value(self.total_xp))?;
        if let Some(ratio) = user.audit_ratio {
            writeln!(out, "Audit ratio: {ratio:.1}")?;
        }
        if let Some(expires) = self.claims.as_ref().and_then(|c| c.expires_at()) {
            writeln!(out, "Session expires: {}", expires.to_rfc3339())?;
        }
        Ok(())
    }
}

impl Render for XpView {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Total XP: {}\n", format_value(self.total))?;
        self.by_project.render_text(out)?;
        out.write_char('\n')?;
        self.progress.render_text(out)?;
        out.write_char('\n')?;
        self.smoothed.render_text(out)?;
        Ok(())
    }
}

impl Render for GradesView {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        self.pass_fail.render_text(out)?;
        out.write_char('\n')?;
        self.pie.render_text(out)?;
        out.write_char('\n')?;
        self.histogram.render_text(out)?;
        Ok(())
    }
}

impl Render for SkillsView {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        self.radar.render_text(out)?;
        Ok(())
    }
}

impl Render for AuditsView {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        self.audit_ratio.render_text(out)?;
        self.pass_fail.render_text(out)?;
        out.write_char('\n')?;
        self.pie.render_text(out)?;
        Ok(())
    }
}

impl Render for Dashboard {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        self.profile.render_text(out)?;
        out.write_char('\n')?;
        self.xp.render_text(out)?;
        out.write_char('\n')?;
        self.grades.render_text(out)?;
        out.write_char('\n')?;
        self.skills.render_text(out)?;
        out.write_char('\n')?;
        self.audits.render_text(out)?;
        Ok(())
    }
}

impl Render for Status {
    fn render_text(&self, out: &mut dyn Write) -> fmt::Result {
        let Some(claims) = &self.claims else {
            return Ok(());
        };
        if let Some(sub) = &claims.sub {
            writeln!(out, "User id: {sub}")?;
        }
        if let Some(expires) = claims.expires_at() {
            writeln!(out, "Expires: {}", expires.to_rfc3339())?;
        }
        if self.expired {
            writeln!(out, "The session has expired, run `kood login` again")?;
        }
        Ok(())
    }
}

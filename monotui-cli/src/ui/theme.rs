//! Palette tokens and style helpers for the dashboard

use ratatui::style::{Color, Modifier, Style};

use monotui_core::model::{FacetKind, ProjectType};
use monotui_core::runtime::RuntimeStatus;

#[derive(Clone, Debug)]
pub struct Palette {
    pub panel_border: Color,
    pub text: Color,
    /// Secondary info
    pub text_dim: Color,
    /// Disabled or empty cells
    pub text_muted: Color,
    pub accent: Color,
    pub success: Color,
    pub warn: Color,
    pub error: Color,
    pub info: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub key_hint: Color,
    /// One color per facet so actions read at a glance
    pub makefile: Color,
    pub package_json: Color,
    pub compose: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),
            success: Color::Rgb(78, 201, 176),
            warn: Color::Rgb(220, 180, 100),
            error: Color::Rgb(244, 135, 113),
            info: Color::Rgb(156, 220, 254),
            selection_bg: Color::Rgb(38, 79, 120),
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120),
            makefile: Color::Rgb(197, 134, 192),
            package_json: Color::Rgb(220, 220, 170),
            compose: Color::Rgb(86, 156, 214),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn status_style(&self, status: RuntimeStatus) -> Style {
        let color = match status {
            RuntimeStatus::Running => self.palette.success,
            RuntimeStatus::Starting | RuntimeStatus::Stopping => self.palette.warn,
            RuntimeStatus::Stopped => self.palette.text_muted,
            RuntimeStatus::Failed | RuntimeStatus::Conflict => self.palette.error,
        };
        Style::default().fg(color)
    }

    pub fn status_icon(&self, status: RuntimeStatus) -> &'static str {
        match status {
            RuntimeStatus::Running => "●",
            RuntimeStatus::Starting => "◐",
            RuntimeStatus::Stopping => "◑",
            RuntimeStatus::Stopped => "○",
            RuntimeStatus::Failed => "✗",
            RuntimeStatus::Conflict => "⚠",
        }
    }

    pub fn facet_style(&self, facet: FacetKind) -> Style {
        let color = match facet {
            FacetKind::Makefile => self.palette.makefile,
            FacetKind::PackageJson => self.palette.package_json,
            FacetKind::Compose => self.palette.compose,
        };
        Style::default().fg(color)
    }

    pub fn project_type_style(&self, project_type: ProjectType) -> Style {
        let color = match project_type {
            ProjectType::Workspace => self.palette.accent,
            ProjectType::App => self.palette.success,
            ProjectType::Package => self.palette.info,
            ProjectType::Infra => self.palette.compose,
            ProjectType::Contract => self.palette.makefile,
        };
        Style::default().fg(color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.palette.accent)
        } else {
            Style::default().fg(self.palette.panel_border)
        }
    }

    pub fn fg(&self, color: Color) -> Style {
        Style::default().fg(color)
    }
}

static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}

/// Shorthands over [`theme()`]
pub mod styles {
    use super::*;

    pub fn status(status: RuntimeStatus) -> Style {
        theme().status_style(status)
    }

    pub fn status_icon(status: RuntimeStatus) -> &'static str {
        theme().status_icon(status)
    }

    pub fn facet(facet: FacetKind) -> Style {
        theme().facet_style(facet)
    }

    pub fn project_type(project_type: ProjectType) -> Style {
        theme().project_type_style(project_type)
    }

    pub fn selection() -> Style {
        theme().selection_style()
    }

    pub fn border(focused: bool) -> Style {
        theme().border_style(focused)
    }

    pub fn key_hint() -> Style {
        theme().fg(theme().palette.key_hint)
    }

    pub fn text() -> Style {
        theme().fg(theme().palette.text)
    }

    pub fn text_dim() -> Style {
        theme().fg(theme().palette.text_dim)
    }

    pub fn text_muted() -> Style {
        theme().fg(theme().palette.text_muted)
    }

    pub fn accent_bold() -> Style {
        theme().fg(theme().palette.accent).add_modifier(Modifier::BOLD)
    }

    pub fn info() -> Style {
        theme().fg(theme().palette.info)
    }

    pub fn success() -> Style {
        theme().fg(theme().palette.success)
    }

    pub fn warn() -> Style {
        theme().fg(theme().palette.warn)
    }

    pub fn error() -> Style {
        theme().fg(theme().palette.error)
    }
}

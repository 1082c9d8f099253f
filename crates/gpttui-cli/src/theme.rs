use ratatui::style::Color;

#[derive(Clone)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub error: Color,
    pub user_color: Color,
    pub assistant_color: Color,
    pub system_color: Color,
    pub border: Color,
    /// Mode indicator colours; text on them uses `indicator_fg`.
    pub normal_mode: Color,
    pub insert_mode: Color,
    pub indicator_fg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            bg: Color::Rgb(30, 30, 30),
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(122, 162, 247),
            muted: Color::Rgb(100, 100, 100),
            error: Color::Rgb(247, 118, 142),
            user_color: Color::Cyan,
            assistant_color: Color::Green,
            system_color: Color::Yellow,
            border: Color::Rgb(60, 60, 60),
            normal_mode: Color::Rgb(158, 206, 106),
            insert_mode: Color::Rgb(122, 162, 247),
            indicator_fg: Color::Rgb(30, 30, 30),
        }
    }

    pub fn gruvbox() -> Self {
        Self {
            name: "gruvbox",
            bg: Color::Rgb(0x28, 0x28, 0x28),
            fg: Color::Rgb(0xEB, 0xDB, 0xB2),
            accent: Color::Rgb(0x83, 0xA5, 0x98),
            muted: Color::Rgb(0x92, 0x83, 0x74),
            error: Color::Rgb(0xFB, 0x49, 0x34),
            user_color: Color::Rgb(0xB8, 0xBB, 0x26),
            assistant_color: Color::Rgb(0x8E, 0xC0, 0x7C),
            system_color: Color::Rgb(0xFA, 0xBD, 0x2F),
            border: Color::Rgb(0x50, 0x49, 0x45),
            normal_mode: Color::Rgb(0x8E, 0xC0, 0x7C),
            insert_mode: Color::Rgb(0x45, 0x85, 0x88),
            indicator_fg: Color::Rgb(0x3C, 0x38, 0x36),
        }
    }

    /// Unknown names fall back to gruvbox.
    pub fn by_name(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            _ => Self::gruvbox(),
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["gruvbox", "dark"]
    }
}

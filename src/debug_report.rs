use allocconf::{Backend, MB, ParseReport, Settings};

/// ANSI styling, switched off for non-terminal output.
#[derive(Clone, Copy)]
enum Style {
    Heading,
    Banner,
    Muted,
    Key,
    Value,
    Notice,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Heading => "\x1b[1;36m",
            Style::Banner => "\x1b[90m",
            Style::Muted => "\x1b[2m",
            Style::Key => "\x1b[34m",
            Style::Value => "\x1b[32m",
            Style::Notice => "\x1b[33m",
        }
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, s: impl AsRef<str>, style: Style) -> String {
        if self.enabled { format!("{}{}\x1b[0m", style.code(), s.as_ref()) } else { s.as_ref().to_string() }
    }

    fn banner(&self, title: &str) {
        println!("\n{}", self.paint(format!("━━━ {title} ━━━"), Style::Banner));
    }
}

/// Everything the report prints about one parse.
pub struct Run {
    pub input: String,
    pub source: Option<&'static str>,
    pub loaded: Option<Backend>,
    pub settings: Settings,
    pub report: ParseReport,
}

pub fn print_run(run: &Run, color: bool) {
    let palette = Palette { enabled: color };
    println!("\n{}", palette.paint(format!("⚙  Settings: \"{}\"", run.input), Style::Heading));
    if let Some(source) = run.source {
        println!("   {}", palette.paint(format!("from {source}"), Style::Muted));
    }

    palette.banner("Options");
    if run.report.options.is_empty() {
        println!("{}", palette.paint("  No options set, all defaults", Style::Muted));
    } else {
        println!("  {}", palette.paint(run.report.options.join(", "), Style::Key));
    }

    palette.banner("Settings");
    print_settings(run, &palette);

    palette.banner("Roundup divisions");
    print_divisions(&run.settings, &palette);

    if !run.report.warnings.is_empty() {
        palette.banner("Warnings");
        for warning in &run.report.warnings {
            println!("  {} {}", palette.paint("•", Style::Notice), warning);
        }
    }
    println!();
}

fn print_settings(run: &Run, palette: &Palette) {
    let s = &run.settings;
    let backend = match run.loaded {
        Some(loaded) => format!("{} (loaded: {loaded})", s.backend()),
        None => s.backend().to_string(),
    };
    let threshold = if s.garbage_collection_threshold() > 0.0 {
        s.garbage_collection_threshold().to_string()
    } else {
        "disabled".to_string()
    };

    let rows = [
        ("backend", backend),
        ("max_split_size", fmt_size(s.max_split_size())),
        ("max_non_split_rounding_size", fmt_size(s.max_non_split_rounding_size())),
        ("garbage_collection_threshold", threshold),
        ("expandable_segments", s.use_expandable_segments().to_string()),
        ("release_lock_on_device_malloc", s.use_release_lock_on_device_malloc().to_string()),
        ("pinned_use_device_host_register", s.pinned_use_device_host_register().to_string()),
        ("pinned_num_register_threads", s.pinned_num_register_threads().to_string()),
        ("pinned_use_background_threads", s.pinned_use_background_threads().to_string()),
    ];
    for (name, value) in rows {
        println!("  {:<32} {}", palette.paint(name, Style::Muted), palette.paint(value, Style::Value));
    }
}

fn print_divisions(settings: &Settings, palette: &Palette) {
    if settings.roundup_power2_divisions().iter().all(|&d| d == 0) {
        println!("{}", palette.paint("  Disabled for every interval", Style::Muted));
        return;
    }
    for (idx, &divisions) in settings.roundup_power2_divisions().iter().enumerate() {
        let start = MB << idx;
        let value = if divisions == 0 { palette.paint("off", Style::Muted) } else { palette.paint(divisions.to_string(), Style::Notice) };
        println!(
            "  {} {:>8} .. {:<8} {}",
            palette.paint(format!("[{idx:>2}]"), Style::Banner),
            fmt_size(start),
            fmt_size(start << 1),
            value
        );
    }
}

fn fmt_size(bytes: usize) -> String {
    if bytes == usize::MAX {
        return "unbounded".to_string();
    }
    let mb = bytes / MB;
    if mb >= 1024 && mb % 1024 == 0 { format!("{}GiB", mb / 1024) } else { format!("{mb}MiB") }
}

/// Curated NerdFont icons used in vlcfetch output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Check,   // 
    Cross,   // 
    Warning, // 
    Info,    // 

    // Files and folders
    Folder,   // 
    Download, // 
    Archive,  // 
    Package,  // 

    // System
    Search, // 
    Lock,   // 
    Gear,   // 
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        match icon {
            NerdFont::Check => '\u{f00c}',    // fa-check
            NerdFont::Cross => '\u{f00d}',    // fa-times
            NerdFont::Warning => '\u{f071}',  // fa-exclamation-triangle
            NerdFont::Info => '\u{f05a}',     // fa-info-circle
            NerdFont::Folder => '\u{f07b}',   // fa-folder
            NerdFont::Download => '\u{f019}', // fa-download
            NerdFont::Archive => '\u{f187}',  // fa-archive
            NerdFont::Package => '\u{f487}',  // oct-package
            NerdFont::Search => '\u{f002}',   // fa-search
            NerdFont::Lock => '\u{f023}',     // fa-lock
            NerdFont::Gear => '\u{f013}',     // fa-gear
        }
    }
}

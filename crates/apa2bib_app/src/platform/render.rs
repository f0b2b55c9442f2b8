use apa2bib_core::AppViewModel;

/// Writes view changes to the terminal: BibTeX to stdout, status to stderr.
#[derive(Debug, Default)]
pub struct Renderer {
    show_status: bool,
    last_status: Option<String>,
    last_output: Option<String>,
}

impl Renderer {
    pub fn new(show_status: bool) -> Self {
        Self {
            show_status,
            ..Self::default()
        }
    }

    pub fn render(&mut self, view: &AppViewModel) {
        if self.show_status {
            let status = view.status_line();
            if self.last_status.as_deref() != Some(status.as_str()) {
                eprintln!("-- {status}");
                self.last_status = Some(status);
            }
        }

        if view.output != self.last_output {
            if let Some(output) = &view.output {
                println!("{output}");
            }
            self.last_output = view.output.clone();
        }
    }
}

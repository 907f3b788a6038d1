use crate::console::print::Printer;
use crate::console::view::FileView;
use crate::debugger::debugee::{MethodInfo, StepReason};
use crate::debugger::{EventHook, Place};
use crossterm::style::Stylize;

pub struct TerminalHook {
    file_view: FileView,
    printer: Printer,
}

impl TerminalHook {
    pub fn new(printer: Printer) -> Self {
        Self {
            file_view: FileView::new(),
            printer,
        }
    }

    fn print_place(&self, ip: u32, place: Option<&Place>) {
        match place {
            Some(place) => match self.file_view.render_source(place) {
                Ok(source) => self.printer.print(source.trim_end_matches('\n')),
                Err(e) => self.printer.print(format!(
                    "{place} {}",
                    format!("(source unavailable: {e:#})").red()
                )),
            },
            None => self.printer.print(format!("(offset {ip})")),
        }
    }
}

impl EventHook for TerminalHook {
    fn on_breakpoint(
        &self,
        ip: u32,
        method: Option<&MethodInfo>,
        place: Option<&Place>,
    ) -> anyhow::Result<()> {
        let name = method.map(|m| m.name.as_str()).unwrap_or("????");
        self.printer
            .print(format!("Hit breakpoint in {}", name.green()));
        self.print_place(ip, place);
        Ok(())
    }

    fn on_step(&self, ip: u32, _: StepReason, place: Option<&Place>) -> anyhow::Result<()> {
        self.print_place(ip, place);
        Ok(())
    }

    fn on_exit(&self, code: i32) {
        self.printer
            .print(format!("Program exit with code: {code}"));
    }
}

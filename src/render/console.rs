// src/render/console.rs

//! Bulleted console rendering of progress and failures.

use std::io::{self, Write};

use crate::config::ConsoleSettings;
use crate::mediator::{ConsumeFuture, Consumer};
use crate::message::Message;
use crate::progress::ProgressTree;
use crate::tree::ErrorTree;
use crate::types::Code;

#[derive(Debug, Clone, Copy)]
enum Bullet {
    Green,
    Yellow,
    Red,
}

impl Bullet {
    fn ansi(self) -> &'static str {
        match self {
            Bullet::Green => "1;32",
            Bullet::Yellow => "1;33",
            Bullet::Red => "1;31",
        }
    }
}

fn bulleted(color: bool, bullet: Bullet, text: &str) -> String {
    if color {
        format!("\x1b[{}m *\x1b[0m {}", bullet.ansi(), text)
    } else {
        format!(" * {text}")
    }
}

/// Consumer printing one bullet line per interesting message.
pub struct BulletedConsole {
    settings: ConsoleSettings,
    out: Box<dyn Write + Send>,
}

impl BulletedConsole {
    /// Console consumer writing to stdout.
    pub fn stdout(settings: ConsoleSettings) -> io::Result<Self> {
        Self::with_writer(settings, Box::new(io::stdout()))
    }

    /// Console consumer writing to `out`. Prints the opening line at once.
    pub fn with_writer(settings: ConsoleSettings, mut out: Box<dyn Write + Send>) -> io::Result<Self> {
        writeln!(
            out,
            "{}",
            bulleted(settings.color, Bullet::Green, "Beginning setup and validation ...")
        )?;
        Ok(Self { settings, out })
    }

    fn say(&mut self, tree: &ProgressTree, text: &str) -> io::Result<()> {
        let line = if self.settings.show_fraction {
            format!("{text} ({}/{}) ...", tree.completed(), tree.total())
        } else {
            text.to_string()
        };
        self.line(Bullet::Green, &line)
    }

    fn line(&mut self, bullet: Bullet, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", bulleted(self.settings.color, bullet, text))
    }

    fn render(&mut self, tree: &ProgressTree, message: &Message) -> io::Result<()> {
        let Message::Node {
            code,
            address,
            text,
            ..
        } = message
        else {
            return Ok(());
        };

        match code {
            Code::Begin if address.is_root() => self.say(tree, "Finished setup and validation")?,
            Code::Done => {
                let description = tree
                    .node(address)
                    .map(|n| n.description().to_string())
                    .unwrap_or_default();
                self.say(tree, &description)?;
                if address.is_root() {
                    self.line(Bullet::Green, "Done.")?;
                }
            }
            Code::Info => self.line(Bullet::Green, text)?,
            Code::Warn => self.line(Bullet::Yellow, text)?,
            Code::Error => self.line(Bullet::Red, text)?,
            _ => {}
        }
        self.out.flush()
    }
}

impl Consumer for BulletedConsole {
    fn consume<'a>(&'a mut self, tree: &'a ProgressTree, message: &'a Message) -> ConsumeFuture<'a> {
        let result = self.render(tree, message).map_err(anyhow::Error::from);
        Box::pin(async move { result })
    }
}

/// Print an error tree depth-first: description, then its messages, then
/// each child indented two more spaces.
pub fn walk_error(tree: &ErrorTree, color: bool, out: &mut dyn Write) -> io::Result<()> {
    walk_error_indented(tree, color, out, "")
}

fn walk_error_indented(
    tree: &ErrorTree,
    color: bool,
    out: &mut dyn Write,
    indent: &str,
) -> io::Result<()> {
    let heading = format!("{indent}{}:", tree.description.as_deref().unwrap_or(""));
    writeln!(out, "{}", bulleted(color, Bullet::Red, &heading))?;

    for message in &tree.messages {
        let line = format!("{indent}  {message}");
        writeln!(out, "{}", bulleted(color, Bullet::Red, &line))?;
    }

    let nested = format!("{indent}  ");
    for child in &tree.children {
        walk_error_indented(child, color, out, &nested)?;
    }
    Ok(())
}

/// Print the full JSON of an error tree on one red bullet line.
pub fn print_error_json(tree: &ErrorTree, color: bool, out: &mut dyn Write) -> io::Result<()> {
    let json = serde_json::to_string(tree).map_err(io::Error::other)?;
    writeln!(out, "{}", bulleted(color, Bullet::Red, &format!("Full JSON: {json}")))
}

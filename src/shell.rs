//! Interactive line-oriented front end (`lat shell`).
//!
//! Each input line is one user action against the [`AppController`]. The
//! shell renders nothing beyond plain text: staged files with their tag
//! chips, the result list, open dialogs, and the status line.
//!
//! # Commands
//!
//! | Command | Action |
//! |---------|--------|
//! | `add <path>...` | stage files (directories are walked) |
//! | `staged` | list staged files and their tags |
//! | `type <n> <text>` | type into staged file *n*'s tag input |
//! | `back <n>` | backspace in staged file *n*'s tag input |
//! | `unstage <n>` | remove staged file *n* |
//! | `upload` | submit every staged file as one batch |
//! | `search <text>` | run a query |
//! | `topk [+\|-\|N]` | show or change top-k |
//! | `filter <text>` / `filter clear` | type into or clear the tag filter |
//! | `results` | list current results |
//! | `edit <n>` | open the edit dialog for result *n* |
//! | `etype <text>` / `eback` / `untag <i>` | edit-dialog typing, backspace, chip removal |
//! | `save` | save the edit dialog |
//! | `delete <n>` / `confirm` | ask to delete result *n*, then confirm |
//! | `cancel` | close whichever dialog is open |
//! | `fetch <n> <file>` | write result *n*'s image to a file |
//! | `status`, `help`, `quit` | |

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::controller::{AppController, QueryOutcome};
use crate::files::collect_files;
use crate::tags::TagChipInput;

const HELP: &str = "\
commands:
  add <path>...          stage image files or directories
  staged                 list staged files
  type <n> <text>        type tags for staged file n (commas make chips)
  back <n>               backspace in staged file n's tag input
  unstage <n>            remove staged file n
  upload                 upload all staged files
  search <text>          query the index
  topk [+|-|N]           show or change the number of results
  filter <text>|clear    type into or clear the tag filter
  results                list current results
  edit <n>               edit tags of result n
  etype <text>           type into the edit dialog
  eback                  backspace in the edit dialog
  untag <i>              remove chip i in the edit dialog
  save                   save the edit dialog
  delete <n>             ask to delete result n
  confirm                confirm the pending delete
  cancel                 close the open dialog
  fetch <n> <file>       save result n's image to a file
  status                 show the status line
  quit                   leave the shell";

/// Whether the shell should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell<W: Write> {
    controller: AppController,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(controller: AppController, out: W) -> Self {
        Self { controller, out }
    }

    pub fn controller(&self) -> &AppController {
        &self.controller
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        writeln!(self.out, "type `help` for commands")?;
        while let Some(line) = lines.next_line().await? {
            if self.execute(&line).await? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Execute one command line. Usage mistakes are reported, not returned.
    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim_start()),
            None => (line, ""),
        };
        match self.dispatch(cmd, rest).await {
            Ok(flow) => Ok(flow),
            Err(e) => {
                writeln!(self.out, "{}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn dispatch(&mut self, cmd: &str, rest: &str) -> Result<Flow> {
        match cmd {
            "" => {}
            "help" => writeln!(self.out, "{}", HELP)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "status" => self.print_status()?,

            "add" => {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    bail!("usage: add <path>...");
                }
                let handles = collect_files(&paths)?;
                let found = handles.len();
                let staged = self.controller.add_files(handles)?;
                writeln!(self.out, "staged {} of {} files", staged, found)?;
            }
            "staged" => self.print_staged()?,
            "type" => {
                let (n, text) = split_index(rest)?;
                self.controller.update_upload_tags(n, |t| t.type_str(text))?;
                self.print_staged()?;
            }
            "back" => {
                let n = parse_index(rest)?;
                self.controller.update_upload_tags(n, |t| {
                    t.on_backspace();
                })?;
                self.print_staged()?;
            }
            "unstage" => {
                let n = parse_index(rest)?;
                self.controller.remove_upload(n)?;
                self.print_staged()?;
            }
            "upload" => match self.controller.submit_batch().await {
                Some(_) => self.print_status()?,
                None => writeln!(self.out, "nothing to upload")?,
            },

            "search" => match self.controller.run_query(rest).await {
                Some(QueryOutcome::Stale) => {}
                Some(_) => self.print_results()?,
                None => {}
            },
            "topk" => {
                match rest {
                    "" => {}
                    "+" => self.controller.increment_top_k(),
                    "-" => self.controller.decrement_top_k(),
                    n => {
                        let value: i64 = n
                            .parse()
                            .with_context(|| format!("not a number: '{}'", n))?;
                        self.controller.set_top_k(value);
                    }
                }
                writeln!(self.out, "top-k: {}", self.controller.top_k())?;
            }
            "filter" => {
                if rest == "clear" {
                    self.controller.tag_filter_mut().clear();
                } else {
                    self.controller.tag_filter_mut().type_str(rest);
                }
                let line = format!("filter: {}", chips(self.controller.tag_filter()));
                writeln!(self.out, "{}", line)?;
            }
            "results" => self.print_results()?,

            "edit" => {
                let path = self.result_path(parse_index(rest)?)?;
                self.controller.open_edit(&path);
                self.print_edit()?;
            }
            "etype" => {
                self.edit_input()?.type_str(rest);
                self.print_edit()?;
            }
            "eback" => {
                self.edit_input()?.on_backspace();
                self.print_edit()?;
            }
            "untag" => {
                let i = parse_index(rest)?;
                self.edit_input()?.remove(i);
                self.print_edit()?;
            }
            "save" => match self.controller.save_edit().await {
                Some(Ok(())) => writeln!(self.out, "tags saved")?,
                Some(Err(_)) => {
                    self.print_status()?;
                    self.print_edit()?;
                }
                None => writeln!(self.out, "no edit dialog open")?,
            },

            "delete" => {
                let path = self.result_path(parse_index(rest)?)?;
                self.controller.request_delete(&path);
                writeln!(
                    self.out,
                    "delete {}? This permanently removes the image. (confirm/cancel)",
                    path
                )?;
            }
            "confirm" => match self.controller.confirm_delete().await {
                Some(Ok(())) => self.print_results()?,
                Some(Err(_)) => {
                    self.print_status()?;
                    if let Some(path) = self.controller.delete_dialog().pending_path() {
                        let line = format!("delete {} still pending (confirm/cancel)", path);
                        writeln!(self.out, "{}", line)?;
                    }
                }
                None => writeln!(self.out, "nothing to confirm")?,
            },
            "cancel" => {
                if self.controller.cancel_edit() || self.controller.cancel_delete() {
                    writeln!(self.out, "cancelled")?;
                } else {
                    writeln!(self.out, "no dialog open")?;
                }
            }

            "fetch" => {
                let (n, file) = split_index(rest)?;
                if file.is_empty() {
                    bail!("usage: fetch <n> <file>");
                }
                let path = self.result_path(n)?;
                let bytes = self.controller.index().fetch_asset(&path).await?;
                std::fs::write(file, &bytes)
                    .with_context(|| format!("Failed to write {}", file))?;
                writeln!(self.out, "wrote {} bytes to {}", bytes.len(), file)?;
            }

            other => writeln!(self.out, "unknown command '{}' (try `help`)", other)?,
        }
        Ok(Flow::Continue)
    }

    fn result_path(&self, index: usize) -> Result<String> {
        self.controller
            .results()
            .get_index(index)
            .map(|r| r.path.clone())
            .with_context(|| format!("no result #{}", index))
    }

    fn edit_input(&mut self) -> Result<&mut TagChipInput> {
        self.controller
            .edit_input_mut()
            .context("no edit dialog open")
    }

    fn print_status(&mut self) -> Result<()> {
        let status = self.controller.status().unwrap_or("").to_string();
        writeln!(self.out, "{}", status)?;
        Ok(())
    }

    fn print_staged(&mut self) -> Result<()> {
        if self.controller.staging().is_empty() {
            writeln!(self.out, "(nothing staged)")?;
        }
        for (i, entry) in self.controller.staging().entries().iter().enumerate() {
            writeln!(self.out, "{:>3}  {:<32} {}", i, entry.file.name, chips(&entry.tags))?;
        }
        Ok(())
    }

    fn print_results(&mut self) -> Result<()> {
        if let Some(err) = self.controller.query_error() {
            writeln!(self.out, "Error: {}", err)?;
            return Ok(());
        }
        if self.controller.results().is_empty() {
            writeln!(self.out, "No results.")?;
        }
        for (i, result) in self.controller.results().iter().enumerate() {
            let marker = if result.tag_match { " [tagged]" } else { "" };
            writeln!(
                self.out,
                "{:>3}  {}{}\n     tags: {}",
                i,
                self.controller.asset_url(&result.path),
                marker,
                result.tags.join(", ")
            )?;
        }
        Ok(())
    }

    fn print_edit(&mut self) -> Result<()> {
        let line = match self.controller.edit_session() {
            Some(session) => format!(
                "editing {}: {}",
                session.target().path,
                chips(session.input())
            ),
            None => "no edit dialog open".to_string(),
        };
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

/// `[a] [b] draft_` rendering of a tag input.
fn chips(input: &TagChipInput) -> String {
    let mut out: Vec<String> = input.tags().iter().map(|t| format!("[{}]", t)).collect();
    out.push(format!("{}_", input.draft()));
    out.join(" ")
}

fn parse_index(text: &str) -> Result<usize> {
    text.trim()
        .parse()
        .with_context(|| format!("expected an index, got '{}'", text.trim()))
}

/// Split `"<n> <rest>"`, keeping `rest` verbatim (it may contain spaces).
fn split_index(text: &str) -> Result<(usize, &str)> {
    let (n, rest) = text.split_once(' ').unwrap_or((text, ""));
    Ok((parse_index(n)?, rest))
}

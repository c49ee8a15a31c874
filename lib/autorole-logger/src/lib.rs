//! Implements a terminal and file system logger for the autorole Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

pub use crossbeam_channel::SendError;
use crossbeam_channel::{Receiver, Sender};
use owo_colors::{OwoColorize, Stream};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// The logging thread's sender channel.
static SENDER: OnceLock<Sender<Message>> = OnceLock::new();

/// Sends a message to the logging thread.
///
/// # Errors
///
/// This function will return an error if the logging thread is closed or was never installed.
fn send(message: Message) -> Result<(), SendError<Message>> {
    match SENDER.get() {
        Some(sender) => sender.send(message),
        None => Err(SendError(message)),
    }
}

/// Queues a log.
///
/// # Errors
///
/// This function will return an error if the logging thread is closed.
pub fn queue(kind: Level, text: impl Display) -> Result<(), SendError<Message>> {
    send(Message::Queue(Log::new(Time::now(), kind, text)))
}

/// Flushes the logger queue.
///
/// # Errors
///
/// This function will return an error if the logging thread is closed.
pub fn flush() -> Result<(), SendError<Message>> {
    send(Message::Flush)
}

/// Closes the logging thread.
///
/// Once closed the thread cannot be re-installed, and every following log returns an error.
///
/// # Errors
///
/// This function will return an error if the logging thread is already closed.
pub fn close() -> Result<(), SendError<Message>> {
    send(Message::Close)
}

/// Initializes the logging thread.
///
/// The returned handle must be kept alive for as long as logs should be written; dropping it
/// closes the thread after flushing any queued logs.
///
/// # Errors
///
/// This function will return an error if the thread cannot be spawned or a logging thread has
/// already been installed.
pub fn install(config: Config, dir: impl AsRef<Path>) -> std::io::Result<LogThread> {
    if SENDER.get().is_some() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "the logging thread has already been installed",
        ));
    }

    let logger = Logger::new(config, dir);
    let (sender, receiver) = crossbeam_channel::unbounded();
    let handle = Builder::new().name("logger".to_string()).spawn(move || run(logger, &receiver))?;

    if SENDER.set(sender).is_err() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "the logging thread has already been installed",
        ));
    }

    Ok(LogThread { handle: Some(handle) })
}

/// The logging thread's main loop.
///
/// # Errors
///
/// This function will return an error if a flush fails.
fn run(mut logger: Logger, receiver: &Receiver<Message>) -> std::io::Result<()> {
    use crossbeam_channel::RecvTimeoutError::{Disconnected, Timeout};

    let timeout = Duration::from_millis(logger.config.stale_time);

    loop {
        match receiver.recv_timeout(timeout) {
            Ok(Message::Queue(log)) if !logger.config.disabled() => logger.queue(log)?,
            Ok(Message::Flush) | Err(Timeout) if !logger.is_empty() => logger.flush()?,
            Ok(Message::Close) | Err(Disconnected) => return logger.flush(),
            _ => {}
        }
    }
}

/// A handle to the installed logging thread.
///
/// Dropping this handle closes the thread and waits for its final flush.
#[derive(Debug)]
pub struct LogThread {
    /// The thread's join handle.
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl LogThread {
    /// Closes the logging thread and waits for it to finish, returning the thread's result.
    ///
    /// # Errors
    ///
    /// This function will return an error if the thread failed to write its logs or panicked.
    pub fn join(mut self) -> std::io::Result<()> {
        self.finish()
    }

    /// Sends the close message and joins the thread, if it has not been joined yet.
    fn finish(&mut self) -> std::io::Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // An error here means the receiver is gone, in which case the thread is already exiting.
        close().ok();

        handle.join().unwrap_or_else(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "the logging thread panicked"))
        })
    }
}

impl Drop for LogThread {
    fn drop(&mut self) {
        if let Err(error) = self.finish() {
            eprintln!("the logging thread failed to close: {error}");
        }
    }
}

/// A message to be sent to the logging thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Outputs a log.
    Queue(Log),
    /// Flushes the logger.
    Flush,
    /// Closes the logging thread.
    Close,
}

/// A logger instance.
#[derive(Debug)]
pub struct Logger {
    /// The logger's configuration.
    config: Config,
    /// The logger's output file path.
    path: Box<Path>,
    /// The logger's output queue.
    queue: Vec<Log>,
}

impl Logger {
    /// A time format for log file names.
    pub const FILENAME_FORMAT: &'static [FormatItem<'static>] = format_description!(
        version = 2,
        "[year repr:last_two][month padding:zero repr:numerical][day padding:zero]-[hour \
         padding:zero repr:24][minute padding:zero][second padding:zero][subsecond digits:6]"
    );

    /// Creates a new [`Logger`] that writes into a new file within the given directory.
    #[must_use]
    pub fn new(config: Config, dir: impl AsRef<Path>) -> Self {
        let time = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let file = time.format(Self::FILENAME_FORMAT).unwrap_or_else(|_| "latest".to_string());

        Self::new_at(config, dir.as_ref().join(file).with_extension("txt"))
    }

    /// Creates a new [`Logger`] that writes into the given file.
    #[must_use]
    pub fn new_at(config: Config, path: impl AsRef<Path>) -> Self {
        let path = Box::from(path.as_ref());

        Self { config, path, queue: Vec::with_capacity(config.queue_size) }
    }

    /// Returns whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns whether the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.config.queue_size
    }

    /// Appends a log to the queue, flushing the logger if its capacity is met or exceeded.
    ///
    /// # Errors
    ///
    /// This function will return an error if log(s) failed to output during a flush.
    pub fn queue(&mut self, log: Log) -> std::io::Result<()> {
        self.queue.push(log);

        if self.is_full() { self.flush() } else { Ok(()) }
    }

    /// Flushes the output queue of this [`Logger`].
    ///
    /// Consecutive logs that share an output stream are written as one block.
    ///
    /// # Errors
    ///
    /// This function will return an error if log(s) failed to output.
    pub fn flush(&mut self) -> std::io::Result<()> {
        let display_color = self.config.support_color();
        let mut iterator = self.queue.drain(..).peekable();
        let mut blocks = vec![];

        while let Some(log) = iterator.next() {
            let color = display_color.then(|| log.display(Some(log.stream())));
            let mut block = (log.kind.error, log.display(None), color);

            while let Some(log) = iterator.next_if(|l| l.kind.error == block.0) {
                block.1.push('\n');
                block.1.push_str(&log.display(None));

                if let Some(ref mut string) = block.2 {
                    string.push('\n');
                    string.push_str(&log.display(Some(log.stream())));
                }
            }

            blocks.push(block);
        }

        if self.config.print {
            let mut out = None;
            let mut err = None;

            for (error, display) in blocks.iter().map(|(e, d, c)| (e, c.as_ref().unwrap_or(d))) {
                if *error {
                    writeln!(err.get_or_insert_with(|| std::io::stderr().lock()), "{display}")?;
                } else {
                    writeln!(out.get_or_insert_with(|| std::io::stdout().lock()), "{display}")?;
                }
            }
        }

        if self.config.write && !blocks.is_empty() {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let mut file = File::options().append(true).create(true).open(&self.path)?;
            let buffer = blocks.into_iter().map(|(_, d, _)| d).collect::<Box<[_]>>().join("\n");

            writeln!(file, "{buffer}")?;
        }

        Ok(())
    }
}

/// A logger configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Whether console output is enabled.
    pub print: bool,
    /// Whether file writing is enabled.
    pub write: bool,
    /// Whether console colors are enabled.
    pub color: bool,
    /// The logger's output queue capacity.
    pub queue_size: usize,
    /// The logger's output queue timeout in milliseconds.
    pub stale_time: u64,
}

impl Config {
    /// Returns whether this [`Config`] has logging disabled entirely.
    #[must_use]
    pub const fn disabled(&self) -> bool {
        !(self.print || self.write) || self.queue_size == 0
    }

    /// Returns whether this [`Config`] allows color support.
    #[must_use]
    pub const fn support_color(&self) -> bool {
        self.print && self.color
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { print: true, write: true, color: true, queue_size: 16, stale_time: 1000 }
    }
}

/// A log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// The log's timestamp.
    pub time: Time,
    /// The log's level.
    pub kind: Level,
    /// The log's text.
    pub text: Box<str>,
}

impl Log {
    /// Creates a new [`Log`].
    pub fn new(time: Time, kind: Level, text: impl Display) -> Self {
        Self { time, kind, text: text.to_string().into_boxed_str() }
    }

    /// Returns the preferred output stream of this [`Log`].
    #[must_use]
    pub const fn stream(&self) -> Stream {
        if self.kind.error { Stream::Stderr } else { Stream::Stdout }
    }

    /// Formats and returns a display string representing this log.
    #[must_use]
    pub fn display(&self, color_stream: Option<Stream>) -> String {
        let time = self.time.display(color_stream);
        let kind = self.kind.display(color_stream);

        format!("{time} {kind} {}", self.text)
    }
}

/// A log timestamp.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    inner: OffsetDateTime,
}

impl Time {
    /// A time format for log headers.
    pub const FORMAT: &'static [FormatItem<'static>] = format_description!(
        version = 2,
        "\\[[day padding:zero]-[month padding:zero repr:numerical]-[year repr:last_two] [hour \
         padding:zero repr:24]:[minute padding:zero]:[second padding:zero].[subsecond digits:6]\\]"
    );

    /// Creates a new [`Time`].
    #[must_use]
    pub const fn new(inner: OffsetDateTime) -> Self {
        Self { inner }
    }

    /// Creates a new [`Time`] containing the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::new(OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()))
    }

    /// Formats and returns a display string representing this timestamp.
    #[must_use]
    pub fn display(&self, color_stream: Option<Stream>) -> String {
        let text = self.inner.format(Self::FORMAT).unwrap_or_else(|_| format!("[{}]", self.inner));

        if let Some(stream) = color_stream {
            text.if_supports_color(stream, |s| s.dimmed()).to_string()
        } else {
            text
        }
    }
}

/// A log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    /// The log level's name.
    pub name: &'static str,
    /// Whether the log level is considered an error.
    pub error: bool,
    /// Colorizes a string with the associated level color.
    pub color: fn(&String) -> String,
}

impl Level {
    /// Creates a new [`Level`].
    pub const fn new(name: &'static str, error: bool, color: fn(&String) -> String) -> Self {
        Self { name, error, color }
    }

    /// Formats and returns a display string representing this log level.
    #[must_use]
    pub fn display(&self, color_stream: Option<Stream>) -> String {
        let text = format!("({})", self.name);

        if let Some(stream) = color_stream {
            text.if_supports_color(stream, self.color).to_string()
        } else {
            text
        }
    }
}

/// Defines log levels.
macro_rules! levels {
    {$($const:ident($name:literal, $error:literal, $color:ident),)* $(,)?} => {
        impl Level {$(
            #[doc = concat!("The ", $name, " logging level.")]
            pub const $const: Self = Self::new($name, $error, |s| ::owo_colors::OwoColorize::$color(s).to_string());
        )*}
    };
}

levels! {
    DEBUG("debug", false, bright_purple),
    INFO("info", false, bright_blue),
    WARN("warn", false, bright_yellow),
    ERROR("error", true, bright_red),
}

/// Outputs a debug log. Debug logs are discarded in release builds.
///
/// ```
/// autorole_logger::debug!("This is a debug log!").ok();
/// ```
#[macro_export]
macro_rules! debug {
    ($($args:tt)+) => {
        if ::std::cfg!(debug_assertions) {
            $crate::queue($crate::Level::DEBUG, ::std::format_args!($($args)+))
        } else {
            ::std::result::Result::<(), $crate::SendError<$crate::Message>>::Ok(())
        }
    };
}

/// Outputs an info log.
///
/// ```
/// autorole_logger::info!("This is an info log!").ok();
/// ```
#[macro_export]
macro_rules! info {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::INFO, ::std::format_args!($($args)+))
    };
}

/// Outputs a warn log.
///
/// ```
/// autorole_logger::warn!("This is a warning log!").ok();
/// ```
#[macro_export]
macro_rules! warn {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::WARN, ::std::format_args!($($args)+))
    };
}

/// Outputs an error log.
///
/// ```
/// autorole_logger::error!("This is an error log!").ok();
/// ```
#[macro_export]
macro_rules! error {
    ($($args:tt)+) => {
        $crate::queue($crate::Level::ERROR, ::std::format_args!($($args)+))
    };
}

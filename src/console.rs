use crate::error::{InvalidInput, PlayerError, Result};
use crate::message::{Message, MessageKey, Notifier, Reply};
use crate::player::Player;
use std::io::{BufRead, Write};
use tracing::{error, info};

const USER_PREFIX: &str = "!!mp";
const ADMIN_PREFIX: &str = "!!mpa";

const HOST_USAGE: &str = "Commands: !!mp <command> | !!mpa <command> | as <user> | reload | quit";
const USER_USAGE: &str = "!!mp list [page] | links [page] | search <keyword> | play [song] | stop | resume | now | mode [mode] | next | prev | add <song|1,2|1-3> | remove <song|1,2|1-3> | queue [page] | qs <keyword> | shuffle | clear";
const ADMIN_USAGE: &str = "!!mpa add <name> <artists> <link> | del <n> | copy <n> | name <n> <name> | artist <n> <artists> | link <n> <link> | duration <n> <seconds> | info [page] | debug [user] | timer_reset <user> | timer_interval <user> <seconds> | timer_active <user> <on|off>";

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn tell(&self, user: &str, text: &str) {
        println!("[{user}] {text}");
    }
}

pub type PlayerFactory = Box<dyn Fn() -> anyhow::Result<Player>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Lines(Vec<String>),
    Quit,
}

enum Routed {
    Reply(Result<Reply>),
    Usage(&'static str),
}

pub struct Console {
    player: Player,
    factory: PlayerFactory,
    user: String,
}

impl Console {
    pub fn new(factory: PlayerFactory, user: impl Into<String>) -> anyhow::Result<Self> {
        let player = factory()?;
        Ok(Self {
            player,
            factory,
            user: user.into(),
        })
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line?;
            match self.run_command(&line) {
                Outcome::Lines(lines) => {
                    for line in lines {
                        writeln!(output, "{line}")?;
                    }
                    output.flush()?;
                }
                Outcome::Quit => break,
            }
        }
        Ok(())
    }

    pub fn run_command(&mut self, raw: &str) -> Outcome {
        let input = raw.trim();
        let (command, rest) = split_word(input);

        match command {
            "" => Outcome::Lines(Vec::new()),
            "quit" | "exit" => Outcome::Quit,
            "help" => Outcome::Lines(vec![
                HOST_USAGE.to_string(),
                USER_USAGE.to_string(),
                ADMIN_USAGE.to_string(),
            ]),
            "as" => {
                if rest.is_empty() {
                    return Outcome::Lines(vec![String::from("Usage: as <user>")]);
                }
                self.user = rest.to_string();
                Outcome::Lines(vec![format!("Acting as {rest}")])
            }
            "reload" => Outcome::Lines(self.reload()),
            USER_PREFIX => {
                let routed = route_user(&self.player, &self.user, rest);
                Outcome::Lines(self.finish(routed))
            }
            ADMIN_PREFIX => {
                let routed = route_admin(&self.player, &self.user, rest);
                Outcome::Lines(self.finish(routed))
            }
            other => Outcome::Lines(vec![format!("Unknown command {other}. {HOST_USAGE}")]),
        }
    }

    fn reload(&mut self) -> Vec<String> {
        match (self.factory)() {
            Ok(fresh) => {
                let carried = fresh.adopt_sessions(&self.player);
                self.player = fresh;
                info!(carried, "player reloaded");
                self.player.render(&[Message::with(
                    MessageKey::SessionsReloaded,
                    [carried.to_string()],
                )])
            }
            Err(err) => {
                error!("reload failed: {err:#}");
                vec![format!("Reload failed: {err:#}")]
            }
        }
    }

    fn finish(&self, routed: Routed) -> Vec<String> {
        match routed {
            Routed::Usage(usage) => vec![format!("Usage: {usage}")],
            Routed::Reply(Ok(reply)) => self.player.render(&reply),
            Routed::Reply(Err(err)) => {
                if err.is_fatal() {
                    error!(user = %self.user, "command failed: {err}");
                }
                self.player.render(&[err.message()])
            }
        }
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let mut split = input.splitn(2, char::is_whitespace);
    let first = split.next().unwrap_or_default();
    let rest = split.next().unwrap_or("").trim();
    (first, rest)
}

fn parse_page(raw: &str) -> Result<Option<usize>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| PlayerError::from(InvalidInput::Page(0)))
}

fn route_user(player: &Player, user: &str, input: &str) -> Routed {
    let (command, rest) = split_word(input);
    let reply = match command {
        "list" => parse_page(rest).and_then(|page| player.list(user, page)),
        "links" => parse_page(rest).and_then(|page| player.links(user, page)),
        "queue" => parse_page(rest).and_then(|page| player.queue(user, page)),
        "play" => player.play(user, Some(rest)),
        "stop" | "pause" => player.pause(user),
        "resume" => player.resume(user),
        "now" => player.now(user),
        "next" => player.next(user),
        "prev" => player.prev(user),
        "shuffle" => player.shuffle(user),
        "clear" => player.clear(user),
        "mode" if rest.is_empty() => Ok(player.mode(user)),
        "mode" => player.set_mode(user, rest),
        "search" | "add" | "remove" | "rm" | "qs" | "queue_search" if rest.is_empty() => {
            return Routed::Usage(USER_USAGE);
        }
        "search" => player.search(user, rest),
        "add" => player.add(user, rest),
        "remove" | "rm" => player.remove(user, rest),
        "qs" | "queue_search" => player.queue_search(user, rest),
        _ => return Routed::Usage(USER_USAGE),
    };
    Routed::Reply(reply)
}

fn route_admin(player: &Player, user: &str, input: &str) -> Routed {
    let (command, rest) = split_word(input);
    let args: Vec<&str> = rest.split_whitespace().collect();
    let reply = match (command, args.as_slice()) {
        ("add", [name, artists, link]) => player.admin_add(name, artists, link),
        ("del" | "delete", [index]) => player.admin_delete(index),
        ("copy", [index]) => player.admin_copy(index),
        ("name", [index, name]) => player.admin_set_name(index, name),
        ("artist", [index, artists]) => player.admin_set_artist(index, artists),
        ("link", [index, link]) => player.admin_set_link(index, link),
        ("duration", [index, seconds]) => player.admin_set_duration(index, seconds),
        ("info", []) => player.admin_info(None),
        ("info", [page]) => parse_page(page).and_then(|page| player.admin_info(page)),
        ("debug", []) => player.debug(user),
        ("debug", [target]) => player.debug(target),
        ("timer_reset", [target]) => player.timer_reset(target),
        ("timer_interval", [target, seconds]) => player.timer_interval(target, seconds),
        ("timer_active", [target, flag]) => player.timer_active(target, flag),
        _ => return Routed::Usage(ADMIN_USAGE),
    };
    Routed::Reply(reply)
}

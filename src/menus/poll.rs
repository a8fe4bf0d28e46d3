use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::{
    emoji::MenuEmoji,
    error::MenuError,
    gateway::{MenuEmbed, MessagingGateway},
    menu::{Menu, MenuKind},
    options::MenuOption,
};

pub const BAR_LENGTH: usize = 10;
const BAR: &str = "█";
const TROPHY: &str = "🏆";
const RESULTS_COLOUR: u32 = 0xF1C40F;

#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub votes: HashMap<String, u64>,
    pub total_votes: u64,
    /// Seconds the poll stays open once enabled.
    pub length: u64,
    pub end_time: Option<DateTime<Utc>>,
}

impl PollState {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            ..Default::default()
        }
    }

    pub(super) fn start(&mut self, now: DateTime<Utc>) {
        let end_time = i64::try_from(self.length)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|length| now.checked_add_signed(length));
        self.end_time = Some(end_time.unwrap_or(DateTime::<Utc>::MAX_UTC));
    }

    /// Ending a poll wipes its votes.
    pub(super) fn reset(&mut self) {
        for votes in self.votes.values_mut() {
            *votes = 0;
        }
        self.total_votes = 0;
        self.end_time = None;
    }

    pub(super) fn decorate(&self, embed: &mut MenuEmbed, footer: &mut Vec<String>, enabled: bool) {
        if !enabled {
            return;
        }
        if let Some(end_time) = self.end_time {
            embed
                .fields
                .push(("Ends".to_string(), format!("<t:{}:R>", end_time.timestamp()), false));
        }
        footer.push(format!("Total votes: {}", self.total_votes));
    }
}

impl Menu {
    /// A poll that closes `length` seconds after being enabled.
    pub fn poll(title: impl Into<String>, description: impl Into<String>, length: u64) -> Self {
        Self::with_kind(title, description, MenuKind::Poll(PollState::new(length)))
    }

    pub fn poll_state(&self) -> Option<&PollState> {
        match &self.kind {
            MenuKind::Poll(poll) => Some(poll),
            _ => None,
        }
    }

    pub(super) fn add_vote(&mut self, emoji: &MenuEmoji) -> bool {
        let MenuKind::Poll(poll) = &mut self.kind else {
            return false;
        };
        let Some(votes) = poll.votes.get_mut(emoji.key()) else {
            return false;
        };
        *votes += 1;
        poll.total_votes += 1;
        true
    }

    pub(super) fn remove_vote(&mut self, emoji: &MenuEmoji) -> bool {
        let MenuKind::Poll(poll) = &mut self.kind else {
            return false;
        };
        let Some(votes) = poll.votes.get_mut(emoji.key()) else {
            return false;
        };
        if *votes == 0 {
            return false;
        }
        *votes -= 1;
        poll.total_votes = poll.total_votes.saturating_sub(1);
        true
    }

    /// True once an enabled poll has passed its end time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.poll_state() {
            Some(PollState {
                end_time: Some(end_time),
                ..
            }) => self.enabled && *end_time <= now,
            _ => false,
        }
    }

    /// Options sorted for the results, most votes first. Ties keep option order.
    fn ranked_options(&self) -> Vec<(&MenuOption, u64)> {
        let Some(poll) = self.poll_state() else {
            return vec![];
        };

        let mut ranked = self
            .options
            .iter()
            .map(|option| {
                let votes = poll.votes.get(option.emoji.key()).copied().unwrap_or(0);
                (option, votes)
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Every option with the highest amount of votes. Empty if nobody voted.
    pub fn winners(&self) -> Vec<MenuEmoji> {
        let ranked = self.ranked_options();
        let Some((_, winning_votes)) = ranked.first() else {
            return vec![];
        };
        if *winning_votes == 0 {
            return vec![];
        }

        ranked
            .iter()
            .filter(|(_, votes)| votes == winning_votes)
            .map(|(option, _)| option.emoji.clone())
            .collect()
    }

    pub fn results_embed(&self) -> MenuEmbed {
        let mut embed = MenuEmbed {
            title: format!("{} - Results", self.title),
            colour: RESULTS_COLOUR,
            ..Default::default()
        };

        let total_votes = self.poll_state().map(|poll| poll.total_votes).unwrap_or(0);
        let ranked = self.ranked_options();

        let winning_votes = match ranked.first() {
            Some((_, votes)) if total_votes > 0 && *votes > 0 => *votes,
            _ => {
                embed.description = "No votes received!".to_string();
                return embed;
            }
        };

        let width = ranked
            .iter()
            .map(|(option, _)| option.descriptor.chars().count())
            .max()
            .unwrap_or(0);

        let mut lines = vec![];
        for (option, votes) in &ranked {
            let bar_length =
                ((*votes as f64 / winning_votes as f64) * BAR_LENGTH as f64).round() as usize;
            let plural = if *votes == 1 { "" } else { "s" };
            let trophy = if *votes == winning_votes {
                format!(" {TROPHY}")
            } else {
                String::new()
            };

            lines.push(format!(
                "{:>width$} | {}{} {votes} vote{plural}{trophy}",
                option.descriptor,
                BAR.repeat(bar_length),
                " ".repeat(BAR_LENGTH - bar_length.min(BAR_LENGTH)),
            ));
        }

        let winners = ranked
            .iter()
            .filter(|(_, votes)| *votes == winning_votes)
            .map(|(option, _)| format!("{} {}", option.emoji, option.descriptor))
            .collect::<Vec<_>>();

        embed.description = format!(
            "{}: {}\n```\n{}\n```",
            if winners.len() == 1 { "Winner" } else { "Tied" },
            winners.join(", "),
            lines.join("\n")
        );
        embed.footer = Some(format!("Total votes: {total_votes}"));

        embed
    }

    /// Posts the results and ends the poll.
    ///
    /// Returns false if the poll wasn't running.
    pub async fn finish_poll(&mut self, gateway: &dyn MessagingGateway) -> Result<bool, MenuError> {
        let handle = self.handle()?;
        if !self.enabled || self.poll_state().is_none() {
            return Ok(false);
        }

        let results = self.results_embed();
        // an ended poll never expires again, even if disabling it fails below
        if let MenuKind::Poll(poll) = &mut self.kind {
            poll.end_time = None;
        }

        gateway.send_message(handle.channel_id, &results).await?;
        self.disable(gateway).await?;
        Ok(true)
    }
}

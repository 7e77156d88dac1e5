//! Interactive collection of the request fields. Malformed answers are
//! re-asked until valid; only a closed input stream ends the loop with an error.

use crate::core::request::{MAX_AMOUNT, MAX_SYMBOL_LEN, MIN_YEAR};
use std::io::{self, BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Prompter::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    /// Asks for a ticker of at most five characters. The ticker is not checked against an exchange.
    pub fn ticker_symbol(&mut self) -> io::Result<String> {
        let mut symbol = self.ask("Enter a stock symbol: ")?;
        while symbol.is_empty() || symbol.chars().count() > MAX_SYMBOL_LEN {
            symbol = self.ask(&format!(
                "Please enter a valid stock symbol of length {MAX_SYMBOL_LEN} or less: "
            ))?;
        }
        Ok(symbol)
    }

    /// Asks for a year after 1700 and no later than `current_year`.
    pub fn buy_year(&mut self, current_year: i32) -> io::Result<i32> {
        loop {
            let answer = self.ask("Enter a year to buy the stock: ")?;
            match answer.parse::<i32>() {
                Ok(year) if year > MIN_YEAR && year <= current_year => return Ok(year),
                Ok(_) => self.say(&format!(
                    "please enter a year between {} and {current_year}",
                    MIN_YEAR + 1
                ))?,
                Err(_) => self.say("please enter a valid year")?,
            }
        }
    }

    /// Asks for a whole, non-negative dollar amount.
    pub fn dollar_amount(&mut self, prompt: &str) -> io::Result<u64> {
        loop {
            let answer = self.ask(prompt)?;
            match parse_amount(&answer) {
                Some(amount) => return Ok(amount),
                None => self.say("please enter a whole, non-negative dollar amount")?,
            }
        }
    }

    /// Like [`Self::dollar_amount`], but a blank answer means zero.
    pub fn optional_dollar_amount(&mut self, prompt: &str) -> io::Result<u64> {
        loop {
            let answer = self.ask(prompt)?;
            if answer.is_empty() {
                return Ok(0);
            }
            match parse_amount(&answer) {
                Some(amount) => return Ok(amount),
                None => self.say("please enter a whole, non-negative dollar amount")?,
            }
        }
    }
}

fn parse_amount(answer: &str) -> Option<u64> {
    let answer = answer.strip_prefix('$').unwrap_or(answer);
    answer.parse::<u64>().ok().filter(|amount| *amount <= MAX_AMOUNT)
}

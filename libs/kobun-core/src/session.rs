//! Quiz session state machine.
//!
//! ```text
//! start ──> Quiz ──submit──> Feedback ──advance──> Quiz ...
//!            │                  │
//!            │ timer expiry     └──advance (last / timed out)──> Summary ──> Result
//!            └──────────────────────────────(no attempts)──────────┘
//! ```
//!
//! Summary and Result offer Retry All and Retry Missed, which start over in
//! Quiz. Operations that do not apply to the current phase are no-ops.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::bank::QuestionBank;
use crate::matching::{judge_answer, MatchResult};
use crate::results::ResultPayload;
use crate::sampler::{sample, shuffle};
use crate::types::{AttemptRecord, Phase, QuestionRecord, QuizConfig, Score};

/// Outcome of a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The tick came from an old timer or arrived outside Quiz. Nothing changed.
    Stale,
    /// One second elapsed; seconds left.
    Running(u32),
    /// The countdown reached zero and the session left Quiz.
    Expired,
}

/// One learner's run through a sampled set of questions.
#[derive(Debug, Clone)]
pub struct QuizSession {
    student_name: String,
    config: QuizConfig,
    phase: Phase,
    questions: Vec<Arc<QuestionRecord>>,
    current_index: usize,
    history: Vec<AttemptRecord>,
    remaining_secs: u32,
    draft: String,
    last_match: Option<MatchResult>,
    timed_out: bool,
    timer_epoch: u64,
}

impl QuizSession {
    /// Start a session with a fresh sample of `config.session_size` questions.
    pub fn start<R: Rng + ?Sized>(
        student_name: impl Into<String>,
        bank: &QuestionBank,
        config: QuizConfig,
        rng: &mut R,
    ) -> Self {
        let questions = sample(bank.records(), config.session_size, rng);
        let mut session = Self {
            student_name: student_name.into(),
            remaining_secs: config.duration_secs,
            config,
            phase: Phase::Quiz,
            questions: Vec::new(),
            current_index: 0,
            history: Vec::new(),
            draft: String::new(),
            last_match: None,
            timed_out: false,
            timer_epoch: 0,
        };
        session.restart_with(questions);
        session
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn questions(&self) -> &[Arc<QuestionRecord>] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Question at the current index, if the session has one.
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.questions.get(self.current_index).map(Arc::as_ref)
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.history.last()
    }

    /// Match details for the attempt shown in Feedback.
    pub fn last_match(&self) -> Option<&MatchResult> {
        self.last_match.as_ref()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether the countdown ended the session early.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Identity of the current countdown. Changes on every transition into or
    /// out of Quiz; ticks carrying an older value are ignored.
    pub fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    pub fn score(&self) -> Score {
        Score::from_history(&self.history, self.questions.len())
    }

    /// Attempts answered incorrectly, in question order.
    pub fn missed(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.history.iter().filter(|a| !a.is_correct)
    }

    /// Replace the draft answer. Only accepted in Quiz.
    pub fn set_draft(&mut self, text: impl Into<String>) -> bool {
        if self.phase != Phase::Quiz {
            return false;
        }
        self.draft = text.into();
        true
    }

    /// Judge `input` for the current question and show its feedback.
    ///
    /// Returns `None` outside Quiz or when no question is left, so a second
    /// submit for the same question is refused.
    pub fn submit(&mut self, input: &str) -> Option<&AttemptRecord> {
        if self.phase != Phase::Quiz {
            return None;
        }
        let question = Arc::clone(self.questions.get(self.current_index)?);

        let result = judge_answer(&question.expected_answer, input, self.config.fold);
        tracing::debug!(
            question = %question.id,
            correct = result.is_correct,
            "answer judged"
        );

        self.history.push(AttemptRecord {
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            expected_answer: question.expected_answer.clone(),
            given_answer: input.to_string(),
            is_correct: result.is_correct,
        });
        self.last_match = Some(result);
        self.set_phase(Phase::Feedback);
        self.history.last()
    }

    /// Submit the current draft.
    pub fn submit_draft(&mut self) -> Option<&AttemptRecord> {
        let draft = std::mem::take(&mut self.draft);
        let submitted = self.phase == Phase::Quiz && self.current_question().is_some();
        if !submitted {
            self.draft = draft;
            return None;
        }
        self.submit(&draft)
    }

    /// Leave Feedback: next question, or Summary after the last one or a
    /// timeout.
    pub fn advance(&mut self) -> bool {
        if self.phase != Phase::Feedback {
            return false;
        }

        let is_last = self.current_index + 1 >= self.questions.len();
        if is_last || self.timed_out {
            self.set_phase(Phase::Summary);
        } else {
            self.current_index += 1;
            self.draft.clear();
            self.last_match = None;
            self.set_phase(Phase::Quiz);
        }
        true
    }

    /// Count down one second if `epoch` is current and the session is in Quiz.
    pub fn tick(&mut self, epoch: u64) -> Tick {
        if epoch != self.timer_epoch || self.phase != Phase::Quiz {
            return Tick::Stale;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running(self.remaining_secs);
        }

        self.expire();
        Tick::Expired
    }

    /// The unanswered question is dropped; the last attempt, if any, is shown
    /// once more before the summary.
    fn expire(&mut self) {
        self.timed_out = true;
        self.draft.clear();
        if self.history.is_empty() {
            tracing::info!(student = %self.student_name, "time up with no attempts");
            self.set_phase(Phase::Summary);
        } else {
            tracing::info!(
                student = %self.student_name,
                answered = self.history.len(),
                total = self.questions.len(),
                "time up"
            );
            self.set_phase(Phase::Feedback);
        }
    }

    /// Summary to Result. No state changes besides the phase.
    pub fn show_result(&mut self) -> bool {
        if self.phase != Phase::Summary {
            return false;
        }
        self.set_phase(Phase::Result);
        true
    }

    /// Start over with a new sample from the whole bank.
    pub fn retry_all<R: Rng + ?Sized>(&mut self, bank: &QuestionBank, rng: &mut R) -> bool {
        if !self.phase.is_finished() {
            return false;
        }
        let questions = sample(bank.records(), self.config.session_size, rng);
        self.restart_with(questions);
        true
    }

    /// Start over with only the questions answered incorrectly, all of them,
    /// shuffled. A no-op when nothing was missed.
    pub fn retry_missed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if !self.phase.is_finished() {
            return false;
        }

        let mut missed: Vec<Arc<QuestionRecord>> = self
            .questions
            .iter()
            .zip(&self.history)
            .filter(|(_, attempt)| !attempt.is_correct)
            .map(|(question, _)| Arc::clone(question))
            .collect();
        if missed.is_empty() {
            return false;
        }

        shuffle(&mut missed, rng);
        self.restart_with(missed);
        true
    }

    /// Build the results payload. Only available once the session is finished.
    pub fn result_payload(
        &self,
        subject: &str,
        device_info: &str,
        now: DateTime<Utc>,
    ) -> Option<ResultPayload> {
        if !self.phase.is_finished() {
            return None;
        }
        Some(ResultPayload::new(
            subject,
            self.student_name.as_str(),
            self.score(),
            self.history.clone(),
            device_info,
            now,
        ))
    }

    fn restart_with(&mut self, questions: Vec<Arc<QuestionRecord>>) {
        tracing::info!(
            student = %self.student_name,
            questions = questions.len(),
            "session started"
        );
        self.questions = questions;
        self.current_index = 0;
        self.history.clear();
        self.draft.clear();
        self.last_match = None;
        self.timed_out = false;
        self.remaining_secs = self.config.duration_secs;
        self.set_phase(Phase::Quiz);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == Phase::Quiz || phase == Phase::Quiz {
            self.timer_epoch += 1;
        }
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FoldDirection;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(id: &str, prompt: &str, answer: &str) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            prompt: prompt.to_string(),
            expected_answer: answer.to_string(),
        }
    }

    fn wokashi_bank() -> QuestionBank {
        QuestionBank::from_records(vec![record("1", "をかし", "趣がある・風情がある")])
    }

    fn bank(n: usize) -> QuestionBank {
        QuestionBank::from_records(
            (1..=n)
                .map(|i| record(&i.to_string(), &format!("問{i}"), &format!("答{i}")))
                .collect(),
        )
    }

    fn config(size: usize, secs: u32) -> QuizConfig {
        QuizConfig {
            session_size: size,
            duration_secs: secs,
            ..QuizConfig::default()
        }
    }

    fn answer_current(session: &mut QuizSession, correct: bool) {
        let expected = session.current_question().unwrap().expected_answer.clone();
        let input = if correct { expected } else { "まちがい".to_string() };
        assert!(session.submit(&input).is_some());
    }

    fn finish(session: &mut QuizSession, pattern: &[bool]) {
        for &correct in pattern {
            answer_current(session, correct);
            assert!(session.advance());
        }
    }

    #[test]
    fn start_samples_and_resets() {
        let mut rng = StdRng::seed_from_u64(1);
        let session = QuizSession::start("太郎", &bank(30), config(20, 300), &mut rng);
        assert_eq!(session.phase(), Phase::Quiz);
        assert_eq!(session.questions().len(), 20);
        assert_eq!(session.current_index(), 0);
        assert!(session.history().is_empty());
        assert_eq!(session.remaining_secs(), 300);
    }

    #[test]
    fn start_with_small_bank_uses_all_questions() {
        let mut rng = StdRng::seed_from_u64(2);
        let session = QuizSession::start("太郎", &bank(3), config(40, 300), &mut rng);
        assert_eq!(session.questions().len(), 3);
    }

    #[test]
    fn scenario_correct_single_question() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = QuizSession::start("太郎", &wokashi_bank(), config(1, 300), &mut rng);
        assert_eq!(session.questions().len(), 1);
        assert_eq!(session.current_question().unwrap().prompt, "をかし");

        let attempt = session.submit("趣がある").unwrap();
        assert!(attempt.is_correct);
        assert_eq!(session.phase(), Phase::Feedback);
        assert_eq!(session.history().len(), 1);

        assert!(session.advance());
        assert_eq!(session.phase(), Phase::Summary);
        let score = session.score();
        assert_eq!((score.correct, score.total, score.percent), (1, 1, 100));
    }

    #[test]
    fn scenario_blank_answer() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = QuizSession::start("太郎", &wokashi_bank(), config(1, 300), &mut rng);
        let attempt = session.submit("").unwrap();
        assert!(!attempt.is_correct);
        assert!(session.advance());
        assert_eq!(session.score().percent, 0);
    }

    #[test]
    fn scenario_timeout_without_attempts() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = QuizSession::start("太郎", &bank(5), config(5, 2), &mut rng);
        let epoch = session.timer_epoch();
        assert_eq!(session.tick(epoch), Tick::Running(1));
        assert_eq!(session.tick(epoch), Tick::Expired);
        assert_eq!(session.phase(), Phase::Summary);
        assert!(session.history().is_empty());
        assert_eq!(session.remaining_secs(), 0);
        let score = session.score();
        assert_eq!((score.correct, score.total), (0, 5));
    }

    #[test]
    fn timeout_after_attempts_shows_last_feedback_then_summary() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut session = QuizSession::start("太郎", &bank(5), config(5, 1), &mut rng);
        answer_current(&mut session, true);
        session.advance();
        session.set_draft("途中");

        let epoch = session.timer_epoch();
        assert_eq!(session.tick(epoch), Tick::Expired);
        assert_eq!(session.phase(), Phase::Feedback);
        assert!(session.timed_out());
        // The unanswered second question is not recorded.
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.draft(), "");

        assert!(session.advance());
        assert_eq!(session.phase(), Phase::Summary);
        assert!(session.history().len() <= session.questions().len());
    }

    #[test]
    fn submit_twice_is_refused() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = QuizSession::start("太郎", &bank(3), config(3, 300), &mut rng);
        assert!(session.submit("a").is_some());
        assert!(session.submit("b").is_none());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].given_answer, "a");
    }

    #[test]
    fn submit_without_questions_is_noop() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = QuizSession::start("太郎", &QuestionBank::default(), config(20, 300), &mut rng);
        assert_eq!(session.phase(), Phase::Quiz);
        assert!(session.submit("趣がある").is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn advance_outside_feedback_is_noop() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = QuizSession::start("太郎", &bank(3), config(3, 300), &mut rng);
        assert!(!session.advance());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn history_tracks_index_in_quiz() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut session = QuizSession::start("太郎", &bank(4), config(4, 300), &mut rng);
        for _ in 0..3 {
            assert_eq!(session.history().len(), session.current_index());
            answer_current(&mut session, true);
            session.advance();
        }
        assert_eq!(session.phase(), Phase::Quiz);
        assert_eq!(session.history().len(), session.current_index());
        answer_current(&mut session, false);
        session.advance();
        assert_eq!(session.phase(), Phase::Summary);
        assert_eq!(session.history().len(), session.questions().len());
    }

    #[test]
    fn history_follows_question_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut session = QuizSession::start("太郎", &bank(5), config(5, 300), &mut rng);
        finish(&mut session, &[true, false, true, false, true]);
        let ids: Vec<_> = session.questions().iter().map(|q| q.id.clone()).collect();
        let answered: Vec<_> = session.history().iter().map(|a| a.question_id.clone()).collect();
        assert_eq!(ids, answered);
    }

    #[test]
    fn draft_is_cleared_on_advance() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut session = QuizSession::start("太郎", &bank(2), config(2, 300), &mut rng);
        let expected = session.current_question().unwrap().expected_answer.clone();
        assert!(session.set_draft(expected));
        let attempt = session.submit_draft().unwrap();
        assert!(attempt.is_correct);
        assert!(!session.set_draft("late"));
        session.advance();
        assert_eq!(session.draft(), "");
    }

    #[test]
    fn timer_only_runs_in_quiz() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut session = QuizSession::start("太郎", &bank(3), config(3, 10), &mut rng);
        let epoch = session.timer_epoch();
        assert_eq!(session.tick(epoch), Tick::Running(9));

        answer_current(&mut session, true);
        assert_eq!(session.tick(session.timer_epoch()), Tick::Stale);
        assert_eq!(session.remaining_secs(), 9);

        session.advance();
        assert_eq!(session.tick(session.timer_epoch()), Tick::Running(8));
    }

    #[test]
    fn stale_epoch_is_ignored() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut session = QuizSession::start("太郎", &bank(3), config(3, 10), &mut rng);
        let old = session.timer_epoch();
        answer_current(&mut session, true);
        session.advance();
        assert_ne!(session.timer_epoch(), old);
        assert_eq!(session.tick(old), Tick::Stale);
        assert_eq!(session.remaining_secs(), 10);
    }

    #[test]
    fn restart_invalidates_old_timer() {
        let mut rng = StdRng::seed_from_u64(15);
        let mut session = QuizSession::start("太郎", &bank(2), config(2, 10), &mut rng);
        let first = session.timer_epoch();
        finish(&mut session, &[true, true]);
        assert!(session.retry_all(&bank(2), &mut rng));
        assert_eq!(session.tick(first), Tick::Stale);
        assert_eq!(session.remaining_secs(), 10);
    }

    #[test]
    fn show_result_only_from_summary() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut session = QuizSession::start("太郎", &bank(1), config(1, 300), &mut rng);
        assert!(!session.show_result());
        finish(&mut session, &[true]);
        let history = session.history().to_vec();
        assert!(session.show_result());
        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(session.history(), history.as_slice());
        assert!(!session.show_result());
    }

    #[test]
    fn retry_all_resamples_from_bank() {
        let mut rng = StdRng::seed_from_u64(17);
        let full = bank(10);
        let mut session = QuizSession::start("太郎", &full, config(4, 300), &mut rng);
        assert!(!session.retry_all(&full, &mut rng));
        finish(&mut session, &[true, true, false, true]);
        session.show_result();
        assert!(session.retry_all(&full, &mut rng));
        assert_eq!(session.phase(), Phase::Quiz);
        assert_eq!(session.questions().len(), 4);
        assert!(session.history().is_empty());
        assert!(!session.timed_out());
    }

    #[test]
    fn retry_missed_uses_all_misses() {
        let mut rng = StdRng::seed_from_u64(18);
        let mut session = QuizSession::start("太郎", &bank(6), config(6, 300), &mut rng);
        finish(&mut session, &[false, true, false, true, false, true]);
        let missed: Vec<String> = session.missed().map(|a| a.question_id.clone()).collect();

        assert!(session.retry_missed(&mut rng));
        assert_eq!(session.phase(), Phase::Quiz);
        let mut replay: Vec<String> = session.questions().iter().map(|q| q.id.clone()).collect();
        let mut expected = missed;
        replay.sort();
        expected.sort();
        assert_eq!(replay, expected);
    }

    #[test]
    fn retry_missed_without_misses_is_noop() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut session = QuizSession::start("太郎", &bank(3), config(3, 300), &mut rng);
        finish(&mut session, &[true, true, true]);
        session.show_result();
        let epoch = session.timer_epoch();

        assert!(!session.retry_missed(&mut rng));
        assert_eq!(session.phase(), Phase::Result);
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.timer_epoch(), epoch);
    }

    #[test]
    fn retry_missed_shares_bank_records() {
        let mut rng = StdRng::seed_from_u64(20);
        let full = bank(2);
        let mut session = QuizSession::start("太郎", &full, config(2, 300), &mut rng);
        finish(&mut session, &[false, false]);
        session.retry_missed(&mut rng);
        assert!(session
            .questions()
            .iter()
            .all(|q| full.records().iter().any(|r| Arc::ptr_eq(q, r))));
    }

    #[test]
    fn result_payload_requires_finished_session() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut session = QuizSession::start("山田", &wokashi_bank(), config(1, 300), &mut rng);
        assert!(session.result_payload("古文単語", "agent", Utc::now()).is_none());
        session.submit("風情");
        session.advance();

        let payload = session.result_payload("古文単語", "agent", Utc::now()).unwrap();
        assert_eq!(payload.user_name, "山田");
        assert_eq!(payload.total, 1);
        assert_eq!(payload.correct, 1);
        assert_eq!(payload.percent, 100);
        assert_eq!(payload.history.len(), 1);
    }

    #[test]
    fn fold_direction_is_applied() {
        let mut rng = StdRng::seed_from_u64(22);
        let config = QuizConfig {
            fold: FoldDirection::HiraganaToKatakana,
            ..config(1, 300)
        };
        let bank = QuestionBank::from_records(vec![record("1", "あはれなり", "しみじみ")]);
        let mut session = QuizSession::start("太郎", &bank, config, &mut rng);
        assert!(session.submit("シミジミ").unwrap().is_correct);
    }
}

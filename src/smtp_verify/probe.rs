use tracing::{debug, info, warn};

use crate::mx::MxRecord;

use super::error::SessionError;
use super::options::SmtpProbeOptions;
use super::session::SmtpSession;
use super::types::{
    AttemptOutcome as Outcome, AttemptStage as Stage, ProbeReport, ServerAttempt, SmtpEvent as Event,
    SmtpReply,
};

/// Probe `address` against `mx_servers` in the given (priority) order without sending a
/// message.
///
/// Servers are tried one at a time, at most `options.max_mx` of them. The first decisive
/// `RCPT TO` answer (250, 550, 451/452) ends the iteration; connection failures, timeouts and
/// other codes move on to the next exchanger. When no server is decisive the outcome is
/// [`ProbeOutcome::Unreachable`](super::ProbeOutcome::Unreachable). Every attempt closes its
/// socket before the next one starts.
///
/// An `address` containing CR or LF is never sent to any server and yields an empty
/// `Unreachable` report.
pub async fn probe_deliverability(
    address: &str,
    mx_servers: &[MxRecord],
    options: &SmtpProbeOptions,
) -> ProbeReport {
    if address.contains(['\r', '\n']) {
        warn!(target: "smtp_probe", "refusing to probe address containing a line break: {:?}", address);
        return ProbeReport::unreachable(Vec::new());
    }

    let mut attempts = Vec::new();
    for record in mx_servers.iter().take(options.max_mx.max(1)) {
        let attempt = probe_server(address, record, options).await;
        debug!(target: "smtp_probe",
            "<{}> via {} (priority {}): {}", address, record.exchange, record.priority, attempt.outcome
        );
        let decisive = attempt.outcome.decisive();
        attempts.push(attempt);
        if let Some(outcome) = decisive {
            info!(target: "smtp_probe", "<{}> decided by {}: {}", address, record.exchange, outcome);
            return ProbeReport {
                outcome,
                server: Some(record.exchange.clone()),
                attempts,
            };
        }
    }
    info!(target: "smtp_probe",
        "<{}> no decisive answer from {} server(s)", address, attempts.len()
    );
    ProbeReport::unreachable(attempts)
}

async fn probe_server(address: &str, record: &MxRecord, options: &SmtpProbeOptions) -> ServerAttempt {
    let mut attempt = ServerAttempt::new(record.exchange.clone());

    let connected = SmtpSession::connect(
        &record.exchange,
        options.port,
        options.connect_timeout,
        options.command_timeout,
    )
    .await;
    let (mut session, peer) = match connected {
        Ok(pair) => pair,
        Err(err) => {
            attempt.events.push(Event::Error {
                stage: Stage::Connect,
                message: err.to_string(),
            });
            attempt.outcome = outcome_for_error(Stage::Connect, err);
            return attempt;
        }
    };
    attempt.address = Some(peer.to_string());

    match run_dialogue(&mut session, &mut attempt.events, address, options).await {
        Ok(outcome) => {
            attempt.outcome = outcome;
            send_quit(&mut session, &mut attempt.events).await;
        }
        Err((stage, err)) => {
            attempt.outcome = outcome_for_error(stage, err);
        }
    }
    session.close().await;
    attempt
}

/// Greeting, EHLO (HELO fallback), MAIL FROM and RCPT TO. An `Err` means the session is no
/// longer usable and must not be sent `QUIT`.
async fn run_dialogue(
    session: &mut SmtpSession,
    events: &mut Vec<Event>,
    address: &str,
    options: &SmtpProbeOptions,
) -> Result<Outcome, (Stage, SessionError)> {
    let greeting = receive(session, events, Stage::Greeting).await?;
    if !greeting.is_positive_completion() {
        return Ok(Outcome::Inconclusive {
            stage: Stage::Greeting,
            reply: greeting,
        });
    }

    let ehlo = exchange(session, events, Stage::Ehlo, &options.ehlo_command()).await?;
    if !ehlo.is_positive_completion() {
        let helo = exchange(session, events, Stage::Helo, &options.helo_command()).await?;
        if !helo.is_positive_completion() {
            return Ok(Outcome::Inconclusive {
                stage: Stage::Helo,
                reply: helo,
            });
        }
    }

    let mail = exchange(session, events, Stage::MailFrom, &options.mail_from_command()).await?;
    if mail.code != 250 {
        return Ok(Outcome::SenderRefused { reply: mail });
    }

    let rcpt_cmd = format!("RCPT TO:<{address}>");
    let rcpt = exchange(session, events, Stage::RcptTo, &rcpt_cmd).await?;
    Ok(classify_rcpt(rcpt))
}

pub(crate) fn classify_rcpt(reply: SmtpReply) -> Outcome {
    match reply.code {
        250 => Outcome::Accepted { reply },
        550 => Outcome::Rejected { reply },
        451 | 452 => Outcome::TemporaryFailure { reply },
        _ => Outcome::Inconclusive {
            stage: Stage::RcptTo,
            reply,
        },
    }
}

fn outcome_for_error(stage: Stage, err: SessionError) -> Outcome {
    match err {
        SessionError::Timeout { stage } => Outcome::TimedOut { stage },
        err if err.is_connect_failure() => Outcome::Unreachable {
            message: err.to_string(),
        },
        other => Outcome::ProtocolError {
            stage,
            message: other.to_string(),
        },
    }
}

async fn receive(
    session: &mut SmtpSession,
    events: &mut Vec<Event>,
    stage: Stage,
) -> Result<SmtpReply, (Stage, SessionError)> {
    match session.read_reply(stage).await {
        Ok(reply) => {
            events.push(Event::Received {
                stage,
                reply: reply.clone(),
            });
            Ok(reply)
        }
        Err(err) => {
            events.push(Event::Error {
                stage,
                message: err.to_string(),
            });
            Err((stage, err))
        }
    }
}

async fn exchange(
    session: &mut SmtpSession,
    events: &mut Vec<Event>,
    stage: Stage,
    command: &str,
) -> Result<SmtpReply, (Stage, SessionError)> {
    events.push(Event::Sent {
        stage,
        command: command.to_string(),
    });
    match session.command(command, stage).await {
        Ok(reply) => {
            events.push(Event::Received {
                stage,
                reply: reply.clone(),
            });
            Ok(reply)
        }
        Err(err) => {
            events.push(Event::Error {
                stage,
                message: err.to_string(),
            });
            Err((stage, err))
        }
    }
}

async fn send_quit(session: &mut SmtpSession, events: &mut Vec<Event>) {
    // Failures here never change the outcome; they only show up in the transcript.
    let _ = exchange(session, events, Stage::Quit, "QUIT").await;
}

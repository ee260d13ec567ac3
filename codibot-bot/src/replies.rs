//! User-facing reply texts

/// Help text sent on /start and /help
pub const HELP: &str = "This bot gives you the ticketing codes of public transit \
vehicles in Trentino, usable with OpenMove subscriptions.\n\
How it works:\n\
(i) BUS: send a message with the bus fleet number (printed on the front bumper, \
the side, or the back of the vehicle) and the bot replies with the code.\n\
(ii) Train: send a message with the station name.\n\
(iii) Trento-Sardagna ropeway: send 'funivia trento' for the valley station code, \
'funivia sardagna' for the mountain station code.\n\n\
Help us grow the collection! Report missing or wrong codes with the /feed command.\n\
Disclaimer: this bot is run by a third-party developer and is in no way affiliated \
with OpenMove, Trentino Trasporti, or any other transit operator. The developer \
takes no responsibility for the correctness of user-submitted data.";

/// Greeting prefix for /start
pub const GREETING: &str = "Hi!";

/// Prompt sent when the feed dialogue starts
pub const FEED_PROMPT: &str =
    "Want to add a code? Tell me the bus number or the station name";

/// Prompt for the code of a train station
pub fn code_prompt_train(station: &str) -> String {
    format!("OK. Tell me the ticketing code of the {station} station")
}

/// Prompt for the code of a bus
pub fn code_prompt_bus(bus: &str) -> String {
    format!("OK. Tell me the ticketing code of bus {bus}")
}

/// Unclassifiable text during the naming step; dialogue abandoned
pub const NEVER_MIND: &str = "No worries :D";

/// Contribution stored (or counted) successfully
pub const THANKS_RECORDED: &str = "Thanks! Your contribution has been recorded";

/// Submission against a persisted record: ignored, but don't discourage
/// the contributor
pub const THANKS: &str = "Thanks";

/// Malformed ticketing code
pub const INVALID_CODE: &str = "Invalid code!";

/// Storage failure, reported generically
pub const INTERNAL_ERROR: &str = "Internal error :(";

/// Query matched no sufficiently-confident record
pub const UNKNOWN_CODE: &str =
    "I don't know the code of this vehicle. Hey, you could tell me yourself!";

/// Free text matched no known pattern
pub const DONT_UNDERSTAND: &str = "I don't understand :(\n\
If you are looking for a station, try fewer words. For example, use 'Borgo' \
for Borgo Valsugana Centro and 'borgo est' for Borgo Valsugana Est";

/// Bots are not welcome
pub const NO_BOTS: &str = "No bots allowed!";

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Parsed arguments for XADD:
/// `XADD key id field value [field value ...]`.
pub struct XaddArguments {
    key: String,
    id_spec: String,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        // At least one field/value pair, and pairs must be complete.
        if arguments.len() < 4 || arguments.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xadd"));
        }

        let fields = arguments[2..]
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(XaddArguments {
            key: arguments[0].clone(),
            id_spec: arguments[1].clone(),
            fields,
        })
    }
}

/// Handles the XADD command. The store validates and (for `*` specs)
/// assigns the entry ID, appends the entry, and wakes any blocked XREAD
/// clients watching this stream. The reply is the assigned ID.
pub async fn xadd(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let mut streams = stores.streams.lock().await;
    let assigned_id = streams.add(
        &xadd_arguments.key,
        &xadd_arguments.id_spec,
        xadd_arguments.fields,
    )?;

    Ok(CommandResult::Response(
        RespValue::bulk_from_str(&assigned_id.to_string()).encode(),
    ))
}

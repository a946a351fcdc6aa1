//! Conversion between leadbot types and `async-openai` types.

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolArgs, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    FunctionCall as OpenAIFunctionCall, FunctionObjectArgs,
};

use crate::completion::{CompletionRequest, FunctionSchema, Reply};
use crate::error::ModelError;
use crate::message::{ChatMessage, FunctionCall, Role};

pub(super) const PROVIDER: &str = "OpenAI";

/// Calls without a provider id still need one on the wire.
const FALLBACK_CALL_ID: &str = "call_0";

pub(super) fn to_openai_request(
    model: &str,
    request: &CompletionRequest,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let messages =
        request.messages.iter().map(to_openai_message).collect::<Result<Vec<_>, _>>()?;

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(model).messages(messages);

    if !request.functions.is_empty() {
        let tools = request.functions.iter().map(to_openai_tool).collect::<Result<Vec<_>, _>>()?;
        builder.tools(tools).tool_choice(ChatCompletionToolChoiceOption::Auto);
    }
    if let Some(temperature) = request.temperature {
        builder.temperature(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        builder.max_tokens(max_tokens);
    }

    builder.build()
}

fn to_openai_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.as_str();
    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default().content(content).build()?.into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into(),
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !content.is_empty() {
                builder.content(content);
            }
            if let Some(call) = &message.function_call {
                builder.tool_calls(vec![ChatCompletionMessageToolCall {
                    id: call.id.clone().unwrap_or_else(|| FALLBACK_CALL_ID.to_string()),
                    r#type: ChatCompletionToolType::Function,
                    function: OpenAIFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                }]);
            }
            builder.build()?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .content(content)
            .tool_call_id(message.tool_call_id.as_deref().unwrap_or(FALLBACK_CALL_ID))
            .build()?
            .into(),
    };
    Ok(converted)
}

fn to_openai_tool(schema: &FunctionSchema) -> Result<ChatCompletionTool, OpenAIError> {
    let function = FunctionObjectArgs::default()
        .name(schema.name.as_str())
        .description(schema.description.as_str())
        .parameters(schema.parameters.clone())
        .build()?;
    ChatCompletionToolArgs::default().r#type(ChatCompletionToolType::Function).function(function).build()
}

/// Interpret the first choice. Only the first tool call is honoured.
pub(super) fn from_openai_response(response: CreateChatCompletionResponse) -> Option<Reply> {
    let message = response.choices.into_iter().next()?.message;
    let text = message.content.filter(|t| !t.trim().is_empty());

    match message.tool_calls.into_iter().flatten().next() {
        Some(tool_call) => Some(Reply::FunctionCall {
            call: FunctionCall::new(tool_call.function.name, tool_call.function.arguments)
                .with_id(tool_call.id),
            text,
        }),
        None => Some(Reply::Text(text.unwrap_or_default())),
    }
}

pub(super) fn to_model_error(error: OpenAIError) -> ModelError {
    match error {
        OpenAIError::Reqwest(e) => {
            ModelError::Request { provider: PROVIDER.to_string(), message: e.to_string() }
        }
        OpenAIError::ApiError(e) => ModelError::Api {
            provider: PROVIDER.to_string(),
            code: e.code.or(e.r#type),
            message: e.message,
        },
        OpenAIError::InvalidArgument(message) => ModelError::Config(message),
        other => ModelError::Response { provider: PROVIDER.to_string(), message: other.to_string() },
    }
}

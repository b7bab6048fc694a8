use watchfinder_core::dialog::directive::{CardAction, ProductCard, ResponseDirective};

use crate::blocks::{ButtonElement, ButtonStyle, MessageBuilder, MessageTemplate};

pub fn render_directives(directives: &[ResponseDirective]) -> Vec<MessageTemplate> {
    directives.iter().map(render_directive).collect()
}

pub fn render_directive(directive: &ResponseDirective) -> MessageTemplate {
    match directive {
        ResponseDirective::Text { text, suggested_actions } => MessageBuilder::new(text.clone())
            .section("watch.text.v1", |section| {
                section.plain(text.clone());
            })
            .actions("watch.text.suggestions.v1", |actions| {
                for (index, suggestion) in suggested_actions.iter().enumerate() {
                    actions.button(
                        ButtonElement::new(format!("watch.suggestion.{}.v1", index + 1), suggestion)
                            .value(suggestion.clone()),
                    );
                }
            })
            .build(),
        ResponseDirective::Card { card } => {
            product_card(MessageBuilder::new(card.title.clone()), card, 1).build()
        }
        ResponseDirective::Carousel { cards } => {
            let mut builder = MessageBuilder::new(format!("{} watches to choose from", cards.len()));
            for (index, card) in cards.iter().enumerate() {
                if index > 0 {
                    builder = builder.divider();
                }
                builder = product_card(builder, card, index + 1);
            }
            builder.build()
        }
        ResponseDirective::ActionLink { title, url } => MessageBuilder::new(title.clone())
            .actions("watch.link.v1", |actions| {
                actions.button(
                    ButtonElement::new("watch.link.open.v1", title.clone())
                        .style(ButtonStyle::Primary)
                        .url(url.clone()),
                );
            })
            .build(),
    }
}

fn product_card(builder: MessageBuilder, card: &ProductCard, position: usize) -> MessageBuilder {
    builder
        .section(format!("watch.card.{position}.title.v1"), |section| {
            section.mrkdwn(format!("*{}*", card.title));
        })
        .image(format!("watch.card.{position}.image.v1"), card.image_url.clone(), card.title.clone())
        .actions(format!("watch.card.{position}.actions.v1"), |actions| {
            for action in &card.actions {
                let button = match action {
                    CardAction::PostBack { title, value } => {
                        ButtonElement::new(format!("watch.card.{position}.postback.v1"), title)
                            .style(ButtonStyle::Primary)
                            .value(value.clone())
                    }
                    CardAction::OpenUrl { title, url } => {
                        ButtonElement::new(format!("watch.card.{position}.open.v1"), title)
                            .url(url.clone())
                    }
                };
                actions.button(button);
            }
        })
}
